//! Field parsers that turn raw listing text into typed values.
//!
//! Every function here is pure and total: unparseable input yields `None`,
//! never an error. The extractors rely on that to drop a bad field without
//! losing the rest of the page.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Origin that root-relative and protocol-relative URLs resolve against.
pub const SITE_ORIGIN: &str = "https://www.lowes.com";

/// Trailing run of 4+ digits in a `/pd/` product-detail path, e.g.
/// `/pd/HGTV-HOME-by-Sherwin-Williams-Paint/1000123456`.
static PD_SKU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/pd/[^?#]*?(\d{4,})/?(?:[?#]|$)").expect("valid regex")
});

/// Parses a price from display text such as `"$1,299.00"` or `"Was $24.98"`.
///
/// Keeps only digits, `.` and `,`, drops `,` as a thousands separator, and
/// parses what remains. Returns `None` when nothing numeric is left or the
/// remainder is not a single decimal number (e.g. `"$12.98 - $15.00"`).
#[must_use]
pub fn parse_price(raw: Option<&str>) -> Option<Decimal> {
    let kept: String = raw?
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    let kept = kept.trim_end_matches('.');
    // "Reg. $24.98" leaves a stray leading dot from the abbreviation.
    let kept = if kept.matches('.').count() > 1 {
        kept.trim_start_matches('.')
    } else {
        kept
    };
    if kept.is_empty() || !kept.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    Decimal::from_str(kept).ok()
}

/// Parses a price from a JSON-LD value, which may be a number or a string.
/// Zero and negative amounts are placeholders, not prices.
#[must_use]
pub fn parse_price_value(value: &serde_json::Value) -> Option<Decimal> {
    let price = match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
        serde_json::Value::String(s) => parse_price(Some(s)),
        _ => None,
    };
    price.filter(|p| *p > Decimal::ZERO)
}

/// Extracts the item number from a product-detail URL.
#[must_use]
pub fn extract_sku(url: Option<&str>) -> Option<String> {
    let url = url?;
    PD_SKU_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Resolves an image reference to an absolute URL.
///
/// `//host/path` gets `https:`, `/path` gets [`SITE_ORIGIN`], absolute URLs
/// pass through, and blank input is `None`. `srcset`-style values keep only
/// the first candidate.
#[must_use]
pub fn normalize_image_url(value: Option<&str>) -> Option<String> {
    let first = value?.split(',').next()?.split_whitespace().next()?;
    normalize_url(Some(first))
}

/// Resolves a link against [`SITE_ORIGIN`] with the same rules as
/// [`normalize_image_url`].
#[must_use]
pub fn normalize_url(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.starts_with("data:") || value.starts_with("javascript:") {
        return None;
    }
    if let Some(rest) = value.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if value.starts_with('/') {
        return Some(format!("{SITE_ORIGIN}{value}"));
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_owned());
    }
    url::Url::parse(SITE_ORIGIN)
        .and_then(|base| base.join(value))
        .ok()
        .map(String::from)
}

/// `true` when availability text explicitly promises same-day pickup.
///
/// Negated phrasings ("Not available for pickup", "Pickup unavailable") do
/// not count.
#[must_use]
pub fn indicates_pickup(text: &str) -> bool {
    let lower = collapse_whitespace(text).to_lowercase();
    let mentions_pickup = ["pickup", "pick up", "pick-up"]
        .iter()
        .any(|needle| lower.contains(needle));
    if !mentions_pickup {
        return false;
    }
    let negated = [
        "not available",
        "unavailable",
        "no pickup",
        "not eligible",
        "out of stock",
        "not in stock",
    ]
    .iter()
    .any(|needle| lower.contains(needle));
    !negated
}

/// Collapses runs of whitespace into single spaces and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips a schema.org prefix from an availability IRI:
/// `"https://schema.org/InStock"` -> `"InStock"`.
#[must_use]
pub fn schema_availability(value: &str) -> String {
    value
        .trim()
        .trim_start_matches("https://schema.org/")
        .trim_start_matches("http://schema.org/")
        .to_owned()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
