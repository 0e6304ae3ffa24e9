use crate::error::FetchError;
use crate::scrapers::cache::PageCache;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::{Freshness, PortalParams};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Portal fetcher over HTTP, with a write-through page cache
///
/// Live requests are spaced by `PortalParams::request_interval`; cache hits
/// never wait.
pub struct HttpFetcher {
    client: Client,
    limiter: Option<DirectRateLimiter>,
    cache: PageCache,
    params: PortalParams,
}

impl HttpFetcher {
    pub fn new(params: PortalParams, cache: PageCache) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()?;

        // Zero interval means unthrottled.
        let limiter = Quota::with_period(params.request_interval).map(RateLimiter::direct);

        Ok(Self {
            client,
            limiter,
            cache,
            params,
        })
    }

    async fn fetch_live(&self, url: &str) -> Result<String, FetchError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        info!("Fetching '{}'", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            warn!("Portal returned status {} for {}", response.status(), url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await?;
        debug!("Downloaded {} bytes of HTML", html.len());
        Ok(html)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, freshness: Freshness) -> Result<String, FetchError> {
        if freshness == Freshness::Cached && self.params.use_cache {
            if let Some(body) = self.cache.get(url) {
                return Ok(body);
            }
        }

        let body = self.fetch_live(&self.params.absolute(url)).await?;
        // Search pages share a last path segment; only listings are cached.
        if !PortalParams::is_listing_path(url) {
            return Ok(body);
        }
        if let Err(e) = self.cache.put(url, &body) {
            warn!(
                "Failed to cache '{}' in '{}': {}",
                url,
                self.cache.dir().display(),
                e
            );
        }
        Ok(body)
    }
}
