//! Typed errors for each stage of a scrape cycle.
//!
//! Library-level code returns these; `main` wraps them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the search URL input file.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input file does not exist. Fatal at startup.
    #[error("url file '{}' missing", path.display())]
    MissingUrlFile { path: PathBuf },

    #[error("failed to read url file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to obtain a raw document for a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// A fetched page lacks the structure an extractor expects.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("missing element: {what}")]
    MissingElement { what: &'static str },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// Errors raised by the listing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A sample was recorded for a URL that was never upserted.
    #[error("unknown listing: {url}")]
    UnknownListing { url: String },
}

/// Any reason a single page could not be turned into data.
///
/// Fetch and parse failures share one skip-and-log policy in the orchestrator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
