mod config;
mod filter;
mod models;
mod price;
mod report;
mod scrapers;
mod store;
mod tracker;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::Parser;
use crate::config::{Settings, MAC_MINI_RULES, SOURCES};
use filter::RelevanceFilter;
use report::Report;
use scrapers::HttpFetcher;
use std::path::PathBuf;
use store::ListingStore;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracker::Tracker;

/// M4 Mac Mini price tracker for willhaben.at and kleinanzeigen.de
#[derive(Parser, Debug)]
#[command(name = "price-scout", version, about)]
struct Cli {
    /// Clear the seen-listings database and exit
    #[arg(long)]
    reset: bool,

    /// Show all current listings, not just new ones
    #[arg(long)]
    all: bool,

    /// Also write this run's listings as JSON to the given file
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the report owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    if cli.reset {
        ListingStore::reset(&settings.db_path)?;
        println!("Database reset.");
        return Ok(());
    }

    info!("🔎 Price Scout - M4 Mac Mini");
    info!("Using listing store {}", settings.db_path.display());

    let fetcher = HttpFetcher::new(&settings).context("Failed to create HTTP client")?;
    let store = ListingStore::open(&settings.db_path)?;
    let tracker = Tracker::new(&fetcher, &store, RelevanceFilter::new(MAC_MINI_RULES));

    let outcome = tracker.run(SOURCES, Utc::now()).await?;

    Report {
        generated_at: Local::now(),
        new_listings: &outcome.new_listings,
        current_listings: &outcome.current_listings,
        total_tracked: outcome.total_tracked,
        sources: &outcome.sources,
        show_all: cli.all,
    }
    .print();

    if let Some(path) = cli.export {
        report::export_json(&path, &outcome.current_listings).await?;
    }

    Ok(())
}
