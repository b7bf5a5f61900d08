use crate::models::Listing;
use crate::price;
use crate::tracker::SourceSummary;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::path::Path;
use tracing::info;

const RULE_WIDTH: usize = 60;

/// Sort by ascending price with unknown (0) prices last; ties keep their order
pub fn sort_by_price(listings: &mut [Listing]) {
    listings.sort_by_key(|l| (!l.has_price(), l.price_minor_units));
}

/// Cheapest listing with a known price
pub fn cheapest(listings: &[Listing]) -> Option<&Listing> {
    listings
        .iter()
        .filter(|l| l.has_price())
        .min_by_key(|l| l.price_minor_units)
}

/// Write the listings as a pretty-printed JSON array
pub async fn export_json(path: &Path, listings: &[Listing]) -> Result<()> {
    let json = serde_json::to_string_pretty(listings)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("💾 Saved {} listings to {}", listings.len(), path.display());
    Ok(())
}

/// Everything the console report shows for one run
#[derive(Debug, Clone)]
pub struct Report<'a> {
    pub generated_at: DateTime<Local>,
    pub new_listings: &'a [Listing],
    pub current_listings: &'a [Listing],
    pub total_tracked: u64,
    pub sources: &'a [SourceSummary],
    pub show_all: bool,
}

impl Report<'_> {
    pub fn print(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f, "\n{}", rule)?;
        writeln!(
            f,
            "  M4 Mac Mini Tracker - {}",
            self.generated_at.format("%Y-%m-%d %H:%M")
        )?;
        writeln!(f, "{}", rule)?;

        if self.new_listings.is_empty() {
            writeln!(f, "\n  No new listings since last check.")?;
        } else {
            write_section(f, "NEW LISTINGS", self.new_listings)?;
        }

        if self.show_all && !self.current_listings.is_empty() {
            write_section(f, "ALL CURRENT LISTINGS", self.current_listings)?;
        }

        if let Some(best) = cheapest(self.current_listings) {
            writeln!(f, "\n  CHEAPEST: {}", truncate(&best.title, 60))?;
            writeln!(
                f,
                "           {} | {} ({})",
                price::format(best.price_minor_units),
                best.site,
                best.location
            )?;
            writeln!(f, "           {}", best.url)?;
        }

        writeln!(f, "\n  Total tracked listings: {}", self.total_tracked)?;
        for source in self.sources {
            if source.fetched {
                writeln!(
                    f,
                    "    {}: {} found, {} relevant",
                    source.site, source.parsed, source.relevant
                )?;
            } else {
                writeln!(f, "    {}: fetch failed", source.site)?;
            }
        }
        Ok(())
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, heading: &str, listings: &[Listing]) -> fmt::Result {
    writeln!(f, "\n  {} ({}):", heading, listings.len())?;
    writeln!(f, "  {}", "-".repeat(50))?;
    for (i, listing) in listings.iter().enumerate() {
        write_listing(f, i + 1, listing)?;
    }
    Ok(())
}

fn write_listing(f: &mut fmt::Formatter<'_>, idx: usize, listing: &Listing) -> fmt::Result {
    writeln!(
        f,
        "  {:>2}. [{}] {:>10} | {}",
        idx,
        listing.site.tag(),
        price::format(listing.price_minor_units),
        truncate(&listing.title, 55)
    )?;
    let location = truncate(&listing.location, 25);
    if !location.is_empty() {
        writeln!(f, "      {}", location)?;
    }
    writeln!(f, "      {}", listing.url)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Site;
    use chrono::TimeZone;

    fn listing(id: &str, price: i64) -> Listing {
        Listing::new(
            Site::Willhaben,
            id,
            format!("Mac Mini M4 #{}", id),
            price,
            format!("https://www.willhaben.at/iad/object?adId={}", id),
            "Wien",
        )
    }

    fn prices(listings: &[Listing]) -> Vec<i64> {
        listings.iter().map(|l| l.price_minor_units).collect()
    }

    #[test]
    fn unknown_prices_sort_last_in_stable_order() {
        let mut listings = vec![
            listing("a", 0),
            listing("b", 500),
            listing("c", 300),
            listing("d", 0),
            listing("e", 100),
        ];
        sort_by_price(&mut listings);

        assert_eq!(prices(&listings), vec![100, 300, 500, 0, 0]);
        assert_eq!(listings[3].id, "wh_a");
        assert_eq!(listings[4].id, "wh_d");
    }

    #[test]
    fn cheapest_ignores_unknown_prices() {
        let listings = vec![listing("a", 0), listing("b", 700), listing("c", 650)];
        assert_eq!(cheapest(&listings).map(|l| l.id.as_str()), Some("wh_c"));
        assert!(cheapest(&[listing("z", 0)]).is_none());
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("Gehäuse", 5), "Gehäu");
        assert_eq!(truncate("kurz", 10), "kurz");
    }

    const SOURCES: &[SourceSummary] = &[
        SourceSummary {
            site: Site::Willhaben,
            fetched: true,
            parsed: 4,
            relevant: 2,
        },
        SourceSummary {
            site: Site::Kleinanzeigen,
            fetched: false,
            parsed: 0,
            relevant: 0,
        },
    ];

    fn report<'a>(new: &'a [Listing], current: &'a [Listing], show_all: bool) -> Report<'a> {
        Report {
            generated_at: Local.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
            new_listings: new,
            current_listings: current,
            total_tracked: 7,
            sources: SOURCES,
            show_all,
        }
    }

    #[test]
    fn renders_new_listings_and_cheapest() {
        let current = vec![listing("1", 64_900), listing("2", 0)];
        let new = vec![current[0].clone()];
        let text = report(&new, &current, false).to_string();

        assert!(text.contains("M4 Mac Mini Tracker - 2026-10-19 09:30"));
        assert!(text.contains("NEW LISTINGS (1):"));
        assert!(text.contains("   1. [WH]     649.00 | Mac Mini M4 #1"));
        assert!(text.contains("CHEAPEST: Mac Mini M4 #1"));
        assert!(text.contains("649.00 | willhaben (Wien)"));
        assert!(text.contains("Total tracked listings: 7"));
        assert!(!text.contains("ALL CURRENT LISTINGS"));
    }

    #[test]
    fn summarises_each_source() {
        let text = report(&[], &[], false).to_string();
        assert!(text.contains("willhaben: 4 found, 2 relevant"));
        assert!(text.contains("kleinanzeigen: fetch failed"));
    }

    #[test]
    fn renders_empty_run() {
        let text = report(&[], &[], true).to_string();
        assert!(text.contains("No new listings since last check."));
        assert!(!text.contains("CHEAPEST"));
        assert!(!text.contains("ALL CURRENT LISTINGS"));
    }

    #[test]
    fn show_all_lists_current_listings() {
        let current = vec![listing("1", 64_900), listing("2", 0)];
        let text = report(&[], &current, true).to_string();
        assert!(text.contains("ALL CURRENT LISTINGS (2):"));
        assert!(text.contains("[WH]  price N/A | Mac Mini M4 #2"));
    }

    #[tokio::test]
    async fn export_writes_listings_as_json() {
        let dir = std::env::temp_dir().join(format!(
            "price-scout-export-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("listings.json");
        let listings = vec![listing("1", 64_900), listing("2", 0)];

        export_json(&path, &listings).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: Vec<Listing> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, listings);
        assert!(text.contains("\"price_minor_units\": 64900"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn export_to_missing_directory_fails() {
        let path = std::env::temp_dir()
            .join(format!("price-scout-missing-{}", std::process::id()))
            .join("nested")
            .join("listings.json");
        let err = export_json(&path, &[]).await.unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
    }
}
