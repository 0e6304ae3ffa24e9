use crate::error::FetchError;
use crate::scrapers::types::Freshness;
use async_trait::async_trait;

/// Common trait for anything that can turn a portal URL into a raw document
///
/// Implementations resolve relative listing paths against the portal origin.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the document at `url`, possibly from cache when `freshness` allows
    async fn fetch(&self, url: &str, freshness: Freshness) -> Result<String, FetchError>;
}
