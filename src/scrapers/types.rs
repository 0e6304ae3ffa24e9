use std::time::Duration;

/// Whether a fetch may be answered from the local page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cached copy is acceptable
    Cached,
    /// Always go to the network (view-count sampling)
    Live,
}

/// Connection settings for the portal
#[derive(Debug, Clone)]
pub struct PortalParams {
    /// Origin that relative listing paths are resolved against
    pub base_url: String,
    /// Minimum spacing between two live requests
    pub request_interval: Duration,
    /// Serve listing pages from cache when available
    pub use_cache: bool,
}

impl Default for PortalParams {
    fn default() -> Self {
        Self {
            base_url: "http://www.hemnet.se".to_string(),
            request_interval: Duration::from_secs(1),
            use_cache: true,
        }
    }
}

impl PortalParams {
    /// Relative portal paths are listing pages; search URLs come in absolute
    pub fn is_listing_path(url: &str) -> bool {
        !(url.starts_with("http://") || url.starts_with("https://"))
    }

    /// Absolute URL for `path`; absolute inputs pass through unchanged
    pub fn absolute(&self, path: &str) -> String {
        if !Self::is_listing_path(path) {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_prefixes_relative_paths() {
        let params = PortalParams::default();
        assert_eq!(params.absolute("/a/1"), "http://www.hemnet.se/a/1");
        assert_eq!(
            params.absolute("https://www.hemnet.se/bostader?x=1"),
            "https://www.hemnet.se/bostader?x=1"
        );
    }

    #[test]
    fn only_relative_paths_are_listings() {
        assert!(PortalParams::is_listing_path("/bostad/lagenhet-1"));
        assert!(!PortalParams::is_listing_path(
            "http://www.hemnet.se/bostader?location_ids=1"
        ));
        assert!(!PortalParams::is_listing_path("https://www.hemnet.se/bostader"));
    }

    #[test]
    fn absolute_tolerates_trailing_slash_on_origin() {
        let params = PortalParams {
            base_url: "http://portal.test/".to_string(),
            ..Default::default()
        };
        assert_eq!(params.absolute("/a/1"), "http://portal.test/a/1");
    }
}
