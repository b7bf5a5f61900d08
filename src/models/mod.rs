use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency every tracked price is expressed in
pub const CURRENCY: &str = "EUR";

/// Classifieds site a listing was scraped from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Willhaben,
    Kleinanzeigen,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Willhaben => "willhaben",
            Site::Kleinanzeigen => "kleinanzeigen",
        }
    }

    /// Short tag used in the console report
    pub fn tag(&self) -> &'static str {
        match self {
            Site::Willhaben => "WH",
            Site::Kleinanzeigen => "KA",
        }
    }

    /// Prefix namespacing the site's native ad id
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Site::Willhaben => "wh",
            Site::Kleinanzeigen => "ka",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "willhaben" => Some(Site::Willhaben),
            "kleinanzeigen" => Some(Site::Kleinanzeigen),
            _ => None,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scraped advertisement, as seen in a single scrape cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// Site-prefixed native ad id, stable across cycles
    pub id: String,
    pub site: Site,
    pub title: String,
    /// Price in cents; 0 means unknown
    pub price_minor_units: i64,
    pub currency: String,
    pub url: String,
    pub location: String,
}

impl Listing {
    /// Build a listing from a site's raw ad id
    pub fn new(
        site: Site,
        raw_id: &str,
        title: impl Into<String>,
        price_minor_units: i64,
        url: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{}_{}", site.id_prefix(), raw_id),
            site,
            title: title.into(),
            price_minor_units,
            currency: CURRENCY.to_string(),
            url: url.into(),
            location: location.into(),
        }
    }

    pub fn has_price(&self) -> bool {
        self.price_minor_units > 0
    }
}

/// Persisted view of a listing across scrape cycles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedListing {
    pub listing: Listing,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}
