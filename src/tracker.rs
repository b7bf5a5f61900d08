use crate::config::SourceConfig;
use crate::filter::RelevanceFilter;
use crate::models::{Listing, Site};
use crate::price;
use crate::report;
use crate::scrapers::{self, Fetcher};
use crate::store::ListingStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Per-source counters for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub site: Site,
    pub fetched: bool,
    pub parsed: usize,
    pub relevant: usize,
}

/// Result of scraping every configured source once
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Listings seen for the first time, cheapest first
    pub new_listings: Vec<Listing>,
    /// Every relevant listing seen this run, cheapest first
    pub current_listings: Vec<Listing>,
    pub total_tracked: u64,
    pub sources: Vec<SourceSummary>,
}

/// Drives fetch, parse, filter and upsert for each source in turn
pub struct Tracker<'a> {
    fetcher: &'a dyn Fetcher,
    store: &'a ListingStore,
    filter: RelevanceFilter,
}

impl<'a> Tracker<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, store: &'a ListingStore, filter: RelevanceFilter) -> Self {
        Self {
            fetcher,
            store,
            filter,
        }
    }

    /// Scrape the sources one after another. A source that cannot be fetched
    /// is skipped; store failures abort the run.
    pub async fn run(&self, sources: &[SourceConfig], now: DateTime<Utc>) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();

        let tx = self.store.transaction()?;
        for source in sources {
            info!("Fetching {} ({})...", source.site, source.country);
            let html = match self.fetcher.fetch(source.url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Could not fetch {}: {}", source.site, e);
                    outcome.sources.push(SourceSummary {
                        site: source.site,
                        fetched: false,
                        parsed: 0,
                        relevant: 0,
                    });
                    continue;
                }
            };

            let parser = scrapers::parser_for(source.site)?;
            debug!("Parsing {} bytes with the {} parser", html.len(), parser.site());
            let parsed = dedup_by_id(parser.parse(&html));
            let relevant: Vec<Listing> = parsed
                .iter()
                .filter(|l| self.filter.is_relevant(l))
                .cloned()
                .collect();
            info!(
                "Found {} listing(s) on {}, {} relevant",
                parsed.len(),
                source.site,
                relevant.len()
            );

            for listing in &relevant {
                if let Some(previous) = self.store.get(&listing.id)? {
                    let old = previous.listing.price_minor_units;
                    if old != listing.price_minor_units {
                        info!(
                            "Price change for {}: {} -> {} (tracked since {})",
                            listing.id,
                            price::format(old),
                            price::format(listing.price_minor_units),
                            previous.first_seen.format("%Y-%m-%d")
                        );
                    }
                }
                if self.store.upsert(listing, now)? {
                    outcome.new_listings.push(listing.clone());
                }
            }

            outcome.sources.push(SourceSummary {
                site: source.site,
                fetched: true,
                parsed: parsed.len(),
                relevant: relevant.len(),
            });
            outcome.current_listings.extend(relevant);
        }
        tx.commit()?;

        report::sort_by_price(&mut outcome.new_listings);
        report::sort_by_price(&mut outcome.current_listings);
        outcome.total_tracked = self.store.count()?;
        Ok(outcome)
    }
}

/// Keep the first occurrence of each id
fn dedup_by_id(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|l| seen.insert(l.id.clone()))
        .collect()
}
