use crate::models::{Listing, Site, TrackedListing};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// SQLite table of every listing seen so far, keyed by listing id
pub struct ListingStore {
    conn: Connection,
}

impl ListingStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        debug!("Opened listing store at {}", path.display());
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS listings (
                id                TEXT PRIMARY KEY,
                site              TEXT,
                title             TEXT,
                price_minor_units INTEGER,
                currency          TEXT DEFAULT 'EUR',
                url               TEXT,
                location          TEXT,
                first_seen        TEXT,
                last_seen         TEXT
            );
            ",
        )
        .context("Failed to create listings table")?;
        Ok(Self { conn })
    }

    /// Delete the database file; a missing file counts as already reset
    pub fn reset(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed listing store {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Record a sighting. Returns true when the id had never been seen.
    pub fn upsert(&self, listing: &Listing, now: DateTime<Utc>) -> Result<bool> {
        let now = now.to_rfc3339_opts(SecondsFormat::Micros, true);

        let updated = self.conn.execute(
            "UPDATE listings SET price_minor_units = ?1, last_seen = ?2 WHERE id = ?3",
            params![listing.price_minor_units, now, listing.id],
        )?;
        if updated > 0 {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO listings
                (id, site, title, price_minor_units, currency, url, location, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                listing.id,
                listing.site.as_str(),
                listing.title,
                listing.price_minor_units,
                listing.currency,
                listing.url,
                listing.location,
                now,
            ],
        )?;
        Ok(true)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    pub fn get(&self, id: &str) -> Result<Option<TrackedListing>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, site, title, price_minor_units, currency, url, location, first_seen, last_seen
                 FROM listings WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, site, title, price, currency, url, location, first, last)) = row else {
            return Ok(None);
        };
        let site = Site::parse(&site).ok_or_else(|| anyhow!("Unknown site {:?} for {}", site, id))?;

        Ok(Some(TrackedListing {
            listing: Listing {
                id,
                site,
                title,
                price_minor_units: price,
                currency,
                url,
                location,
            },
            first_seen: parse_timestamp(&first)?,
            last_seen: parse_timestamp(&last)?,
        }))
    }

    /// Open a transaction around a batch of upserts; rolls back unless committed
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Bad timestamp {:?}", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn listing(id: &str, price: i64) -> Listing {
        Listing::new(
            Site::Kleinanzeigen,
            id,
            "Mac Mini M4",
            price,
            format!("https://www.kleinanzeigen.de/s-anzeige/x/{}", id),
            "Berlin",
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn first_sighting_is_new() {
        let store = ListingStore::open_in_memory().unwrap();
        assert!(store.upsert(&listing("1", 50_000), t0()).unwrap());
        assert_eq!(store.count().unwrap(), 1);

        let tracked = store.get("ka_1").unwrap().unwrap();
        assert_eq!(tracked.listing, listing("1", 50_000));
        assert_eq!(tracked.first_seen, t0());
        assert_eq!(tracked.last_seen, t0());
    }

    #[test]
    fn repeat_sighting_updates_in_place() {
        let store = ListingStore::open_in_memory().unwrap();
        let later = t0() + Duration::hours(6);

        assert!(store.upsert(&listing("1", 50_000), t0()).unwrap());
        assert!(!store.upsert(&listing("1", 50_000), later).unwrap());
        assert_eq!(store.count().unwrap(), 1);

        let tracked = store.get("ka_1").unwrap().unwrap();
        assert_eq!(tracked.first_seen, t0());
        assert_eq!(tracked.last_seen, later);
    }

    #[test]
    fn price_changes_are_tracked() {
        let store = ListingStore::open_in_memory().unwrap();
        store.upsert(&listing("1", 50_000), t0()).unwrap();
        store
            .upsert(&listing("1", 45_000), t0() + Duration::days(1))
            .unwrap();

        let tracked = store.get("ka_1").unwrap().unwrap();
        assert_eq!(tracked.listing.price_minor_units, 45_000);
    }

    #[test]
    fn unknown_id_is_absent() {
        let store = ListingStore::open_in_memory().unwrap();
        assert!(store.get("ka_404").unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn uncommitted_batch_rolls_back() {
        let store = ListingStore::open_in_memory().unwrap();
        {
            let _tx = store.transaction().unwrap();
            store.upsert(&listing("1", 100), t0()).unwrap();
        }
        assert_eq!(store.count().unwrap(), 0);

        let tx = store.transaction().unwrap();
        store.upsert(&listing("2", 200), t0()).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn reset_wipes_everything() {
        let dir = std::env::temp_dir().join(format!(
            "price-scout-store-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let path = dir.join("listings.db");

        {
            let store = ListingStore::open(&path).unwrap();
            store.upsert(&listing("1", 100), t0()).unwrap();
            store.upsert(&listing("2", 200), t0()).unwrap();
            assert_eq!(store.count().unwrap(), 2);
        }

        ListingStore::reset(&path).unwrap();
        assert!(!path.exists());
        ListingStore::reset(&path).unwrap();

        let store = ListingStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 0);

        drop(store);
        let _ = fs::remove_dir_all(&dir);
    }
}
