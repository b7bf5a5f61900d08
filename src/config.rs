use crate::models::Site;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// A classifieds search scraped on every run
#[derive(Debug, Clone, Copy)]
pub struct SourceConfig {
    pub site: Site,
    pub url: &'static str,
    pub country: &'static str,
}

pub const SOURCES: &[SourceConfig] = &[
    SourceConfig {
        site: Site::Willhaben,
        url: "https://www.willhaben.at/iad/kaufen-und-verkaufen/marktplatz?keyword=mac+mini+m4&sort=1",
        country: "AT",
    },
    SourceConfig {
        site: Site::Kleinanzeigen,
        url: "https://www.kleinanzeigen.de/s-preis::/mac-mini-m4/k0",
        country: "DE",
    },
];

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,de;q=0.8";

/// Keyword tables driving the relevance filter (lowercase, substring matched)
#[derive(Debug, Clone, Copy)]
pub struct RelevanceRules {
    /// Spellings of the tracked product; one must appear in the title
    pub product_names: &'static [&'static str],
    /// Accessories and wanted-ads that only mention the product
    pub accessories: &'static [&'static str],
    /// Other product families that get confused with the tracked one
    pub other_products: &'static [&'static str],
    /// Offers where the tracked product is not what is being sold
    pub not_primary: &'static [&'static str],
}

pub const MAC_MINI_RULES: RelevanceRules = RelevanceRules {
    product_names: &["mac mini", "macmini"],
    accessories: &[
        "dock", "docking", "hub", "adapter", "kabel", "cable",
        "mikrofon", "microphone", "gehäuse", "case", "tasche", "bag",
        "halterung", "mount", "ladegerät", "charger", "ständer", "stand",
        "netzteil", "power adapter", "ssd gehäuse", "ssd-gehäuse",
        "wacom", "monitor", "gaming pc",
        "suche", "ankauf",
    ],
    other_products: &["macbook", "mac book", "mac pro", "mac studio", "imac"],
    not_primary: &["asus nuc", "intel nuc", "gegen mac"],
};

/// Runtime knobs, overridable through `SCOUT_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults
    pub fn load() -> Result<Self> {
        ::config::Config::builder()
            .add_source(::config::Environment::with_prefix("SCOUT").try_parsing(true))
            .build()
            .context("Failed to read SCOUT_* environment")?
            .try_deserialize()
            .context("Invalid SCOUT_* setting")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

fn default_db_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".price-scout").join("listings.db"),
        None => PathBuf::from("listings.db"),
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_backoff_secs() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_site_is_configured_once() {
        assert_eq!(SOURCES.len(), 2);
        assert!(SOURCES.iter().any(|s| s.site == Site::Willhaben));
        assert!(SOURCES.iter().any(|s| s.site == Site::Kleinanzeigen));
    }

    #[test]
    fn keyword_tables_are_lowercase() {
        let rules = MAC_MINI_RULES;
        for kw in rules
            .product_names
            .iter()
            .chain(rules.accessories)
            .chain(rules.other_products)
            .chain(rules.not_primary)
        {
            assert_eq!(*kw, kw.to_lowercase());
        }
    }

    #[test]
    fn environment_overrides_defaults() {
        std::env::set_var("SCOUT_DB_PATH", "/tmp/price-scout-env/listings.db");
        std::env::set_var("SCOUT_MAX_RETRIES", "5");
        let loaded = Settings::load();
        std::env::remove_var("SCOUT_DB_PATH");
        std::env::remove_var("SCOUT_MAX_RETRIES");

        let settings = loaded.unwrap();
        assert_eq!(
            settings.db_path,
            PathBuf::from("/tmp/price-scout-env/listings.db")
        );
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.timeout_secs, 20);
        assert_eq!(settings.backoff_secs, 2);
    }

    #[test]
    fn defaults_match_fetch_policy() {
        let settings = Settings::default();
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.timeout(), Duration::from_secs(20));
        assert_eq!(settings.backoff(), Duration::from_secs(2));
        assert!(settings.db_path.ends_with("listings.db"));
    }
}
