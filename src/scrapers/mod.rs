pub mod cache;
pub mod http;
pub mod listing;
pub mod search;
pub mod traits;
pub mod types;

pub use cache::PageCache;
pub use http::HttpFetcher;
pub use listing::ListingExtractor;
pub use search::SearchResultExtractor;
pub use traits::PageFetcher;
pub use types::{Freshness, PortalParams};
