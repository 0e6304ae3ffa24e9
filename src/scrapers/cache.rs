//! File-backed HTML cache keyed by the last path segment of a URL.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache key for `url`: final non-empty path segment, query and fragment stripped
    pub fn key(url: &str) -> Option<&str> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        path.rsplit('/').find(|segment| !segment.is_empty())
    }

    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let key = Self::key(url)?;
        // Keys become file names; anything path-like is not cacheable.
        if key.contains(['\\', ':']) || key == "." || key == ".." {
            return None;
        }
        Some(self.dir.join(format!("{}.html", key)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let path = self.path_for(url)?;
        match fs::read_to_string(&path) {
            Ok(body) => {
                debug!("Cache hit for '{}'", url);
                Some(body)
            }
            Err(_) => None,
        }
    }

    /// Store `body` as the latest copy for `url`
    pub fn put(&self, url: &str, body: &str) -> io::Result<()> {
        let Some(path) = self.path_for(url) else {
            return Ok(());
        };
        fs::create_dir_all(&self.dir)?;
        fs::write(path, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_last_path_segment() {
        assert_eq!(
            PageCache::key("/bostad/lagenhet-2rum-stockholm-12345"),
            Some("lagenhet-2rum-stockholm-12345")
        );
        assert_eq!(PageCache::key("http://portal.test/a/1/"), Some("1"));
        assert_eq!(PageCache::key("/a/1?utm=x#top"), Some("1"));
        assert_eq!(PageCache::key("/"), None);
    }

    #[test]
    fn put_then_get_round_trips_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = PageCache::new(tmp.path().join("cache"));

        assert!(cache.get("/a/1").is_none());
        cache.put("/a/1", "<html>old</html>").unwrap();
        cache.put("/a/1", "<html>new</html>").unwrap();
        assert_eq!(cache.get("/a/1").as_deref(), Some("<html>new</html>"));
        assert!(cache.dir().join("1.html").exists());
    }

    #[test]
    fn uncacheable_urls_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = PageCache::new(tmp.path());
        cache.put("/a/..", "x").unwrap();
        assert!(cache.get("/a/..").is_none());
    }
}
