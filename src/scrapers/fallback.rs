//! Helpers for the regex salvage parsers that run when a page's structured
//! data cannot be found.

use regex::Regex;
use std::sync::OnceLock;

static RE_TAGS: OnceLock<Regex> = OnceLock::new();
static RE_SPACES: OnceLock<Regex> = OnceLock::new();
static RE_TITLE_ATTR: OnceLock<Regex> = OnceLock::new();

/// Slice `html` from `before` bytes ahead of `start` to `after` bytes past `end`,
/// widened to the nearest char boundaries
pub fn window(html: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let mut lo = start.saturating_sub(before);
    while !html.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = end.saturating_add(after).min(html.len());
    while !html.is_char_boundary(hi) {
        hi += 1;
    }
    &html[lo..hi]
}

/// Trimmed value of the first `title="..."` attribute in the chunk
pub fn title_near(chunk: &str) -> Option<String> {
    let re = RE_TITLE_ATTR.get_or_init(|| Regex::new(r#"(?i)\btitle="([^"]*)""#).unwrap());
    let value = re.captures(chunk)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Drop markup tags and collapse whitespace
pub fn strip_tags(html: &str) -> String {
    let tags = RE_TAGS.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let spaces = RE_SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    let text = tags.replace_all(html, "");
    spaces.replace_all(text.trim(), " ").into_owned()
}
