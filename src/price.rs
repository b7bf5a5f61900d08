//! Price text normalization.
//!
//! Classifieds sites print prices in German locale (`1.149 €`, `449,00 €`,
//! `VB 500`). Everything is converted to integer cents; text that cannot be
//! read yields 0, which the rest of the crate treats as "price unknown".

use regex::Regex;
use std::sync::OnceLock;

static RE_NUMBER: OnceLock<Regex> = OnceLock::new();
static RE_CONTEXT_PRICES: OnceLock<[Regex; 3]> = OnceLock::new();

/// Convert locale-formatted price text into cents
pub fn normalize(text: &str) -> i64 {
    let cleaned = text
        .replace('\u{a0}', " ")
        .replace("VB", "")
        .replace("VHB", "");

    let re = RE_NUMBER.get_or_init(|| Regex::new(r"(\d[\d.,]*\d|\d+)").unwrap());
    let Some(m) = re.find(cleaned.trim()) else {
        return 0;
    };
    let raw = m.as_str();

    let has_dot = raw.contains('.');
    let has_comma = raw.contains(',');
    let number = if has_dot && has_comma {
        // 1.234,56
        raw.replace('.', "").replace(',', ".")
    } else if has_comma {
        // 449,00
        raw.replace(',', ".")
    } else if has_dot {
        // 1.149 is thousands, 449.00 is decimal
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() == 2 && parts[1].len() == 3 {
            raw.replace('.', "")
        } else {
            raw.to_string()
        }
    } else {
        raw.to_string()
    };

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => (value * 100.0).round() as i64,
        _ => 0,
    }
}

/// Find a price-like token in a chunk of raw markup
pub fn find_in_context(chunk: &str) -> i64 {
    let patterns = RE_CONTEXT_PRICES.get_or_init(|| {
        [
            Regex::new(r"(?i)(\d[\d.,]*)\s*(?:€|EUR|euro)").unwrap(),
            Regex::new(r"(?i)(?:€|EUR)\s*(\d[\d.,]*)").unwrap(),
            Regex::new(r"(?i)price[^>]*>[\s€]*(\d[\d.,]*)").unwrap(),
        ]
    });

    for re in patterns {
        if let Some(caps) = re.captures(chunk) {
            return normalize(&caps[1]);
        }
    }
    0
}

/// Render cents as `1,149.00`, or `price N/A` when unknown
pub fn format(cents: i64) -> String {
    if cents <= 0 {
        return "price N/A".to_string();
    }

    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}.{:02}", grouped, cents % 100)
}
