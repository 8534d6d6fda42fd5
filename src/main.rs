//! # News Harvest
//!
//! A news ingestion pipeline that discovers article links from configured
//! sources (RSS/Atom feeds, XML sitemaps and HTML listing pages), extracts
//! title, publish date and body text with several independent strategies,
//! and stores one normalized record per link.
//!
//! ## Usage
//!
//! ```sh
//! news_harvest --sites-file feed/conf/sites.json --output data/articles.json
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: each site's adapter yields candidate links, truncated per source
//! 2. **Extraction**: candidates fan out under a concurrency cap; every link
//!    is run through the metadata, boilerplate and readability strategies
//!    and the results are merged field by field
//! 3. **Persistence**: records are upserted by link into a JSON file store
//!
//! Sites are processed under a separate, outer concurrency cap. A failing
//! feed, page or site is logged and skipped; it never aborts the run.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod extract;
mod http;
mod models;
mod normalize;
mod orchestrator;
mod pipeline;
mod sources;
mod store;
mod utils;

use cli::Cli;
use error::HarvestError;
use http::HttpClient;
use pipeline::Pipeline;
use store::json::JsonFileStore;
use store::memory::MemoryStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "news_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // A missing sites file means there is nothing to do, not a crash.
    let sites = match config::load_sites(&args.sites_file).await {
        Ok(sites) => sites,
        Err(HarvestError::Config(reason)) => {
            error!(%reason, "No site configuration; nothing to do");
            return Ok(());
        }
        Err(e) => {
            error!(path = %args.sites_file.display(), error = %e, "Failed to read site configuration");
            return Err(e.into());
        }
    };

    if !args.dry_run {
        if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = ensure_writable_dir(dir).await {
                error!(
                    path = %dir.display(),
                    error = %e,
                    "Output directory is not writable (fix perms or choose a different path)"
                );
                return Err(e.into());
            }
        }
    }

    let client = HttpClient::new(&args.http_config())?;
    let limits = args.limits();
    info!(
        sites = sites.len(),
        feeds_per_site = limits.feeds_per_site,
        articles_per_feed = limits.articles_per_feed,
        concurrency = limits.concurrency,
        site_concurrency = limits.site_concurrency,
        dry_run = args.dry_run,
        "Starting harvest"
    );

    let (report, stored_total) = if args.dry_run {
        let store = MemoryStore::new();
        let report = Pipeline::new(&client, &store, limits).run(&sites).await;
        (report, store.len())
    } else {
        let store = JsonFileStore::open(&args.output).await?;
        let report = Pipeline::new(&client, &store, limits).run(&sites).await;
        (report, store.len().await)
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles_created = report.articles_created(),
        articles_failed = report.articles_failed(),
        sites_failed = report.sites_failed(),
        stored_total,
        "Execution complete"
    );

    Ok(())
}
