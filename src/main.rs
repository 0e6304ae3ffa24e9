mod config;
mod error;
mod export;
mod logging;
mod models;
mod orchestrator;
mod scrapers;
mod store;

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use config::{Cli, Settings};
use export::Exporter;
use orchestrator::ScrapeOrchestrator;
use scrapers::{HttpFetcher, PageCache};
use store::ListingStore;

/// Exit status when the search URL file is missing
const EXIT_MISSING_INPUT: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = cli.settings();

    logging::init(&settings.log_path)?;
    info!("Script run");

    // The URL file must exist before anything touches the store.
    let search_urls = match config::read_search_urls(&settings.urls_file) {
        Ok(urls) => urls,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            return Ok(ExitCode::from(EXIT_MISSING_INPUT));
        }
    };

    run(&cli, &settings, &search_urls).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: &Cli, settings: &Settings, search_urls: &[String]) -> anyhow::Result<()> {
    let store = ListingStore::open(&settings.db_path)
        .with_context(|| format!("Failed to open store '{}'", settings.db_path.display()))?;

    if cli.scrape {
        info!("Scraping {} search pages", search_urls.len());
        let fetcher = HttpFetcher::new(settings.portal.clone(), PageCache::new(&settings.cache_dir))
            .context("Failed to create HTTP client")?;
        let orchestrator = ScrapeOrchestrator::new(&store, &fetcher)?;
        orchestrator.run_cycle(search_urls).await?;
    }

    if cli.object || cli.datapoints {
        store.ensure_schema()?;
        let exporter = Exporter::new(&store, &settings.portal);
        if cli.object {
            print!("{}", exporter.export_listings()?);
        }
        if cli.datapoints {
            print!("{}", exporter.export_samples()?);
        }
    }

    Ok(())
}
