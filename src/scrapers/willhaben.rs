use crate::models::{Listing, Site};
use crate::price;
use crate::scrapers::fallback;
use crate::scrapers::traits::ListingParser;
use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

static RE_NEXT_DATA: OnceLock<Regex> = OnceLock::new();
static RE_AD_LINK: OnceLock<Regex> = OnceLock::new();

const BASE_URL: &str = "https://www.willhaben.at";

/// willhaben.at search page parser
///
/// The search page is a Next.js app that ships every result inside the
/// `__NEXT_DATA__` script. When that blob is missing or changes shape, ad
/// links are salvaged from the raw markup instead.
pub struct WillhabenParser {
    next_data: Selector,
}

impl WillhabenParser {
    pub fn new() -> Result<Self> {
        let next_data = Selector::parse("script#__NEXT_DATA__")
            .map_err(|e| anyhow!("Invalid willhaben selector: {}", e))?;
        Ok(Self { next_data })
    }

    fn parse_next_data(&self, html: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let Some(script) = document.select(&self.next_data).next() else {
            debug!("No __NEXT_DATA__ script found in DOM");
            return Vec::new();
        };
        let blob = script.text().collect::<String>();
        listings_from_blob(&blob)
    }
}

fn listings_from_blob(blob: &str) -> Vec<Listing> {
    match serde_json::from_str::<Value>(blob) {
        Ok(data) => {
            let mut listings = Vec::new();
            collect_ads(&data, &mut listings);
            listings
        }
        Err(e) => {
            debug!("__NEXT_DATA__ is not valid JSON: {}", e);
            Vec::new()
        }
    }
}

/// Walk the Next.js payload looking for the advert summary list
fn collect_ads(value: &Value, out: &mut Vec<Listing>) {
    match value {
        Value::Object(map) => {
            if let Some(list) = map.get("advertSummaryList") {
                if let Some(ads) = list.get("advertSummary").and_then(Value::as_array) {
                    out.extend(ads.iter().filter_map(parse_ad));
                }
                return;
            }
            if let Some(result) = map.get("searchResult") {
                collect_ads(result, out);
                return;
            }
            if let Some(rows) = map.get("rows").and_then(Value::as_array) {
                for row in rows {
                    collect_ads(row, out);
                }
                return;
            }
            for v in map.values() {
                collect_ads(v, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ads(item, out);
            }
        }
        _ => {}
    }
}

fn parse_ad(ad: &Value) -> Option<Listing> {
    let ad_id = scalar_text(ad.get("id")?)?;
    let title = ad
        .get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| ad.get("title").and_then(Value::as_str))?
        .trim();
    if ad_id.is_empty() || title.is_empty() {
        return None;
    }

    let attrs = attributes(ad);
    let price_text = attrs
        .get("PRICE")
        .or_else(|| attrs.get("PRICE/AMOUNT"))
        .map(String::as_str)
        .unwrap_or("0");
    let location = attrs
        .get("LOCATION")
        .or_else(|| attrs.get("ADDRESS"))
        .cloned()
        .unwrap_or_default();

    Some(Listing::new(
        Site::Willhaben,
        &ad_id,
        title,
        price::normalize(price_text),
        format!("{}/iad/object?adId={}", BASE_URL, ad_id),
        location,
    ))
}

/// First value of every `{name, values}` entry under `attributes.attribute`
fn attributes(ad: &Value) -> HashMap<String, String> {
    ad.get("attributes")
        .and_then(|a| a.get("attribute"))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let name = entry.get("name")?.as_str()?;
                    let first = entry.get("values")?.as_array()?.first()?;
                    Some((name.to_string(), scalar_text(first)?))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Locate `__NEXT_DATA__` with a plain regex when the DOM parse missed it
fn regex_next_data(html: &str) -> Vec<Listing> {
    let re = RE_NEXT_DATA.get_or_init(|| {
        Regex::new(r#"(?s)<script\s+id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap()
    });
    match re.captures(html) {
        Some(caps) => listings_from_blob(&caps[1]),
        None => Vec::new(),
    }
}

/// Salvage ads from `/iad/kaufen-und-verkaufen/d/<slug>-<id>/` links
fn regex_ad_links(html: &str) -> Vec<Listing> {
    let re = RE_AD_LINK.get_or_init(|| {
        Regex::new(r#"(?i)href="(/iad/kaufen-und-verkaufen/d/[^"]*-(\d+)/)"[^>]*>"#).unwrap()
    });

    re.captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let href = caps.get(1)?.as_str();
            let ad_id = caps.get(2)?.as_str();
            let context = fallback::window(html, whole.start(), whole.end(), 500, 500);
            let title = fallback::title_near(context)
                .unwrap_or_else(|| format!("Willhaben listing #{}", ad_id));
            Some(Listing::new(
                Site::Willhaben,
                ad_id,
                title,
                price::find_in_context(context),
                format!("{}{}", BASE_URL, href),
                "Austria",
            ))
        })
        .collect()
}

impl ListingParser for WillhabenParser {
    fn parse(&self, html: &str) -> Vec<Listing> {
        let listings = self.parse_next_data(html);
        if !listings.is_empty() {
            return listings;
        }

        let listings = regex_next_data(html);
        if !listings.is_empty() {
            debug!("Recovered {} willhaben ads via regex __NEXT_DATA__", listings.len());
            return listings;
        }

        let listings = regex_ad_links(html);
        if !listings.is_empty() {
            warn!(
                "willhaben structured data missing, salvaged {} ads from links",
                listings.len()
            );
        }
        listings
    }

    fn site(&self) -> Site {
        Site::Willhaben
    }
}
