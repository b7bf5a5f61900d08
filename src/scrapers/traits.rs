use crate::models::{Listing, Site};
use crate::scrapers::FetchError;
use async_trait::async_trait;

/// Downloads the raw markup of a search page
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Common trait for all classifieds page parsers
/// Parsing never fails: a page whose shape is not recognised yields no listings
pub trait ListingParser: Send + Sync {
    fn parse(&self, html: &str) -> Vec<Listing>;

    fn site(&self) -> Site;
}
