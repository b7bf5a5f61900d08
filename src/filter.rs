use crate::config::RelevanceRules;
use crate::models::Listing;
use std::fmt;
use tracing::debug;

/// Why a listing was rejected by the relevance filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingProductName,
    Accessory(&'static str),
    OtherProduct(&'static str),
    NotPrimary(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingProductName => f.write_str("product name missing"),
            Rejection::Accessory(kw) => write!(f, "accessory keyword {:?}", kw),
            Rejection::OtherProduct(kw) => write!(f, "other product {:?}", kw),
            Rejection::NotPrimary(kw) => write!(f, "not the item for sale ({:?})", kw),
        }
    }
}

/// Ordered keyword filter separating real product offers from accessories
/// and unrelated ads. Rules run in order and the first rejection wins.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceFilter {
    rules: RelevanceRules,
}

impl RelevanceFilter {
    pub fn new(rules: RelevanceRules) -> Self {
        Self { rules }
    }

    pub fn is_relevant(&self, listing: &Listing) -> bool {
        match self.check(&listing.title) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Skipping {} {:?}: {}", listing.id, listing.title, reason);
                false
            }
        }
    }

    /// Classify a title, returning the first rule it violates
    pub fn check(&self, title: &str) -> Result<(), Rejection> {
        let title = title.to_lowercase();

        if !self.rules.product_names.iter().any(|name| title.contains(name)) {
            return Err(Rejection::MissingProductName);
        }
        if let Some(kw) = first_hit(&title, self.rules.accessories) {
            return Err(Rejection::Accessory(kw));
        }
        if let Some(kw) = first_hit(&title, self.rules.other_products) {
            return Err(Rejection::OtherProduct(kw));
        }
        if let Some(kw) = first_hit(&title, self.rules.not_primary) {
            return Err(Rejection::NotPrimary(kw));
        }
        Ok(())
    }
}

fn first_hit(title: &str, keywords: &'static [&'static str]) -> Option<&'static str> {
    keywords.iter().copied().find(|kw| title.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAC_MINI_RULES;
    use crate::models::Site;

    fn filter() -> RelevanceFilter {
        RelevanceFilter::new(MAC_MINI_RULES)
    }

    fn listing(title: &str) -> Listing {
        Listing::new(Site::Kleinanzeigen, "1", title, 0, "", "")
    }

    #[test]
    fn accepts_plain_offer() {
        assert!(filter().is_relevant(&listing("Apple Mac Mini M4 16GB wie neu")));
        assert!(filter().is_relevant(&listing("MacMini M4 256GB OVP")));
    }

    #[test]
    fn rejects_titles_without_product_name() {
        assert_eq!(
            filter().check("Apple M4 Rechner 16GB"),
            Err(Rejection::MissingProductName)
        );
    }

    #[test]
    fn rejects_accessories_even_with_product_name() {
        assert!(!filter().is_relevant(&listing("Mac Mini M4 docking station")));
        assert_eq!(
            filter().check("Netzteil für Mac mini M4"),
            Err(Rejection::Accessory("netzteil"))
        );
        assert!(!filter().is_relevant(&listing("Suche Mac Mini M4")));
    }

    #[test]
    fn rejects_confusable_products() {
        assert_eq!(
            filter().check("MacBook Air M4 oder Mac Mini"),
            Err(Rejection::OtherProduct("macbook"))
        );
        assert!(!filter().is_relevant(&listing("Mac Studio M4 Max statt Mac mini")));
    }

    #[test]
    fn rejects_trade_offers() {
        assert_eq!(
            filter().check("Intel NUC 13 tausche gegen Mac Mini"),
            Err(Rejection::NotPrimary("intel nuc"))
        );
    }

    #[test]
    fn rejection_reasons_are_readable() {
        assert_eq!(
            Rejection::Accessory("hub").to_string(),
            "accessory keyword \"hub\""
        );
    }

    #[test]
    fn accessory_rule_runs_before_product_rule() {
        assert_eq!(
            filter().check("iMac Kabel für Mac Mini"),
            Err(Rejection::Accessory("kabel"))
        );
    }
}
