pub mod fallback;
pub mod fetcher;
pub mod kleinanzeigen;
pub mod traits;
pub mod willhaben;

pub use fetcher::{FetchError, HttpFetcher};
pub use kleinanzeigen::KleinanzeigenParser;
pub use traits::{Fetcher, ListingParser};
pub use willhaben::WillhabenParser;

use crate::models::Site;
use anyhow::Result;

/// Parser for the given site
pub fn parser_for(site: Site) -> Result<Box<dyn ListingParser>> {
    Ok(match site {
        Site::Willhaben => Box::new(WillhabenParser::new()?),
        Site::Kleinanzeigen => Box::new(KleinanzeigenParser::new()?),
    })
}
