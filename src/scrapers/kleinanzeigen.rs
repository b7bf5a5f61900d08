use crate::models::{Listing, Site};
use crate::price;
use crate::scrapers::fallback;
use crate::scrapers::traits::ListingParser;
use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, warn};

static RE_AD_BLOCK: OnceLock<Regex> = OnceLock::new();

const BASE_URL: &str = "https://www.kleinanzeigen.de";

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid kleinanzeigen selector {:?}: {}", css, e))
}

/// kleinanzeigen.de search page parser
pub struct KleinanzeigenParser {
    card: Selector,
    title: Selector,
    price: Selector,
    location: Selector,
}

impl KleinanzeigenParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            card: selector("article, li.ad-listitem")?,
            title: selector("a.ellipsis")?,
            price: selector(r#"[class*="aditem-main--middle--price"], [class*="price-label"]"#)?,
            location: selector(
                r#"[class*="aditem-main--top--left"], [class*="aditem-main--top--right"]"#,
            )?,
        })
    }

    /// Read listing cards straight from the result list markup
    fn parse_cards(&self, html: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for card in document.select(&self.card) {
            let ad_id = card
                .value()
                .attr("data-adid")
                .or_else(|| card.value().attr("data-id"))
                .unwrap_or("")
                .trim();
            if ad_id.is_empty() {
                continue;
            }

            let Some(link) = card.select(&self.title).next() else {
                continue;
            };
            let title = element_text(link);
            if title.is_empty() {
                continue;
            }

            let url = link
                .value()
                .attr("href")
                .filter(|href| href.contains("/s-anzeige/"))
                .or_else(|| card.value().attr("data-href"))
                .map(absolute_url)
                .unwrap_or_default();

            let price_minor_units = card
                .select(&self.price)
                .map(|el| price::normalize(&element_text(el)))
                .find(|cents| *cents > 0)
                .unwrap_or(0);

            let location = card
                .select(&self.location)
                .map(element_text)
                .find(|text| text.chars().count() > 2)
                .unwrap_or_default();

            listings.push(Listing::new(
                Site::Kleinanzeigen,
                ad_id,
                title,
                price_minor_units,
                url,
                location,
            ));
        }

        listings
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", BASE_URL, href)
    }
}

/// Salvage ads by pairing `data-adid` attributes with the next ad link
fn regex_ad_blocks(html: &str) -> Vec<Listing> {
    let re = RE_AD_BLOCK.get_or_init(|| {
        Regex::new(r#"(?s)data-adid="(\d+)".*?href="(/s-anzeige/[^"]*)".*?>(.*?)</a>"#).unwrap()
    });

    re.captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let ad_id = caps.get(1)?.as_str();
            let href = caps.get(2)?.as_str();
            let title = fallback::strip_tags(caps.get(3)?.as_str());
            let title = if title.is_empty() {
                format!("Kleinanzeigen listing #{}", ad_id)
            } else {
                title
            };
            let context = fallback::window(html, whole.start(), whole.end(), 0, 800);
            Some(Listing::new(
                Site::Kleinanzeigen,
                ad_id,
                title,
                price::find_in_context(context),
                absolute_url(href),
                "Germany",
            ))
        })
        .collect()
}

impl ListingParser for KleinanzeigenParser {
    fn parse(&self, html: &str) -> Vec<Listing> {
        let listings = self.parse_cards(html);
        if !listings.is_empty() {
            debug!("Parsed {} kleinanzeigen cards", listings.len());
            return listings;
        }

        let listings = regex_ad_blocks(html);
        if !listings.is_empty() {
            warn!(
                "kleinanzeigen cards not found, salvaged {} ads with regex",
                listings.len()
            );
        }
        listings
    }

    fn site(&self) -> Site {
        Site::Kleinanzeigen
    }
}
