//! Command line surface and the settings derived from it.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::InputError;
use crate::scrapers::PortalParams;

const DEFAULT_URLS_FILE: &str = "urls.txt";
const DEFAULT_DB_FILE: &str = "data.sqlite";
const DEFAULT_LOG_FILE: &str = "log.txt";
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_BASE_URL: &str = "http://www.hemnet.se";
const DEFAULT_INTERVAL_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Track housing listings and their view counts over time")]
pub struct Cli {
    /// Run one scrape cycle
    #[arg(short, long)]
    pub scrape: bool,

    /// Print the listings table as CSV
    #[arg(short, long)]
    pub object: bool,

    /// Print the view-count matrix as CSV
    #[arg(short, long)]
    pub datapoints: bool,

    /// File with one search-result URL per line
    #[arg(short, long, default_value = DEFAULT_URLS_FILE)]
    pub url: PathBuf,

    /// SQLite database file
    #[arg(long, default_value = DEFAULT_DB_FILE)]
    pub db: PathBuf,

    /// Append-only log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log: PathBuf,

    /// Directory for cached listing pages
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Never serve listing pages from the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Portal origin that listing paths are relative to
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Minimum milliseconds between two network requests
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,
}

/// Resolved run settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub urls_file: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub cache_dir: PathBuf,
    pub portal: PortalParams,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            urls_file: PathBuf::from(DEFAULT_URLS_FILE),
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            portal: PortalParams::default(),
        }
    }
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            urls_file: self.url.clone(),
            db_path: self.db.clone(),
            log_path: self.log.clone(),
            cache_dir: self.cache_dir.clone(),
            portal: PortalParams {
                base_url: self.base_url.clone(),
                request_interval: Duration::from_millis(self.interval_ms),
                use_cache: !self.no_cache,
            },
        }
    }
}

/// Read the search URLs, skipping blank lines and `#` comments
pub fn read_search_urls(path: &Path) -> Result<Vec<String>, InputError> {
    if !path.exists() {
        return Err(InputError::MissingUrlFile {
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings_default() {
        let cli = Cli::try_parse_from(["listing-tracker"]).unwrap();
        let settings = cli.settings();
        let defaults = Settings::default();

        assert!(!cli.scrape && !cli.object && !cli.datapoints);
        assert_eq!(settings.urls_file, defaults.urls_file);
        assert_eq!(settings.db_path, defaults.db_path);
        assert_eq!(settings.portal.base_url, defaults.portal.base_url);
        assert_eq!(
            settings.portal.request_interval,
            defaults.portal.request_interval
        );
        assert!(settings.portal.use_cache);
    }

    #[test]
    fn flags_compose() {
        let cli = Cli::try_parse_from([
            "listing-tracker",
            "-s",
            "-o",
            "-d",
            "--url",
            "searches.txt",
            "--no-cache",
            "--interval-ms",
            "250",
        ])
        .unwrap();
        assert!(cli.scrape && cli.object && cli.datapoints);

        let settings = cli.settings();
        assert_eq!(settings.urls_file, PathBuf::from("searches.txt"));
        assert!(!settings.portal.use_cache);
        assert_eq!(settings.portal.request_interval, Duration::from_millis(250));
    }

    #[test]
    fn missing_url_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("urls.txt");
        let err = read_search_urls(&path).unwrap_err();
        assert!(matches!(err, InputError::MissingUrlFile { .. }));
    }

    #[test]
    fn url_file_skips_blanks_and_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("urls.txt");
        fs::write(
            &path,
            "# Södermalm\nhttp://www.hemnet.se/bostader?a=1\n\n  http://www.hemnet.se/bostader?a=2  \n",
        )
        .unwrap();

        let urls = read_search_urls(&path).unwrap();
        assert_eq!(
            urls,
            vec![
                "http://www.hemnet.se/bostader?a=1",
                "http://www.hemnet.se/bostader?a=2"
            ]
        );
    }
}
