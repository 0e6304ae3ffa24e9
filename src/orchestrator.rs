//! One scrape cycle: discover, reconcile, add new listings, sample the live ones.

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, ScrapeError, StoreError, StoreResult};
use crate::models::ListingAttributes;
use crate::scrapers::{Freshness, ListingExtractor, PageFetcher, SearchResultExtractor};
use crate::store::ListingStore;

/// What a cycle did, for the log
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub search_pages: usize,
    pub observed: usize,
    pub listings_added: usize,
    pub listings_skipped: usize,
    pub samples_recorded: usize,
    pub samples_skipped: usize,
}

pub struct ScrapeOrchestrator<'a, F: PageFetcher> {
    store: &'a ListingStore,
    fetcher: &'a F,
    listing: ListingExtractor,
    search: SearchResultExtractor,
}

impl<'a, F: PageFetcher> ScrapeOrchestrator<'a, F> {
    pub fn new(store: &'a ListingStore, fetcher: &'a F) -> Result<Self, ExtractionError> {
        Ok(Self {
            store,
            fetcher,
            listing: ListingExtractor::new()?,
            search: SearchResultExtractor::new()?,
        })
    }

    /// Run one full cycle against `search_urls`.
    ///
    /// Page-level failures are logged and skipped; only store failures abort.
    pub async fn run_cycle(&self, search_urls: &[String]) -> StoreResult<CycleReport> {
        let mut report = CycleReport::default();
        self.store.ensure_schema()?;

        let observed = self.discover(search_urls, &mut report).await;
        report.observed = observed.len();

        // With no search page answering, absence says nothing about liveness.
        if !search_urls.is_empty() && report.search_pages == 0 {
            warn!(
                "All {} search pages failed; keeping current liveness",
                search_urls.len()
            );
        } else {
            self.store.reconcile_liveness(&observed)?;
            self.add_new_listings(&observed, &mut report).await?;
        }

        for url in self.store.live_urls()? {
            let count = match self.sample_views(&url).await {
                Ok(count) => count,
                Err(e) => {
                    warn!("No view count for '{}': {}", url, e);
                    report.samples_skipped += 1;
                    continue;
                }
            };
            match self.store.record_sample(&url, count) {
                Ok(true) => report.samples_recorded += 1,
                Ok(false) => debug!("Sample for '{}' already taken this hour", url),
                Err(StoreError::UnknownListing { url }) => {
                    warn!("Sampled unknown listing '{}'", url);
                    report.samples_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            search_pages = report.search_pages,
            observed = report.observed,
            added = report.listings_added,
            skipped = report.listings_skipped,
            samples = report.samples_recorded,
            samples_skipped = report.samples_skipped,
            "Scrape cycle finished"
        );
        Ok(report)
    }

    async fn add_new_listings(
        &self,
        observed: &IndexSet<String>,
        report: &mut CycleReport,
    ) -> StoreResult<()> {
        for url in observed {
            if self.store.contains(url)? {
                continue;
            }
            match self.scrape_listing(url).await {
                Ok(attrs) => {
                    if self.store.upsert_listing(url, &attrs)? {
                        report.listings_added += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping listing '{}': {}", url, e);
                    report.listings_skipped += 1;
                }
            }
        }
        Ok(())
    }

    /// Union of listing URLs across all search pages, first-seen order
    async fn discover(&self, search_urls: &[String], report: &mut CycleReport) -> IndexSet<String> {
        let mut observed = IndexSet::new();
        for url in search_urls {
            match self.fetcher.fetch(url, Freshness::Live).await {
                Ok(html) => {
                    let found = self.search.extract(&html);
                    debug!("Search page '{}' lists {} listings", url, found.len());
                    observed.extend(found);
                    report.search_pages += 1;
                }
                Err(e) => warn!("Skipping search page '{}': {}", url, e),
            }
        }
        observed
    }

    async fn scrape_listing(&self, url: &str) -> Result<ListingAttributes, ScrapeError> {
        let html = self.fetcher.fetch(url, Freshness::Cached).await?;
        Ok(self.listing.extract(&html)?)
    }

    async fn sample_views(&self, url: &str) -> Result<i64, ScrapeError> {
        let html = self.fetcher.fetch(url, Freshness::Live).await?;
        Ok(self.listing.view_count(&html)?)
    }
}
