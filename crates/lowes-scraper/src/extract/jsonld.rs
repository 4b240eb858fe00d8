//! schema.org `Product` extraction from `<script type="application/ld+json">`.

use std::sync::LazyLock;

use lowes_core::{CaptureContext, ProductDraft, ProductRecord};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use super::{Extraction, ProductSource};
use crate::parse::{
    collapse_whitespace, extract_sku, normalize_image_url, normalize_url, parse_price_value,
    schema_availability,
};

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// Price types that mark a pre-discount reference price.
const WAS_PRICE_TYPES: &[&str] = &["ListPrice", "StrikethroughPrice", "MSRP"];

/// Structured-data source. Does not look at availability text; the page's
/// filter state is the only pickup signal it carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLdSource;

impl ProductSource for JsonLdSource {
    fn name(&self) -> &'static str {
        "json-ld"
    }

    fn extract(&self, html: &str, ctx: &CaptureContext) -> Extraction {
        let blocks: Vec<Value> = SCRIPT_RE
            .captures_iter(html)
            .filter_map(|cap| cap.get(1))
            .filter_map(|body| match serde_json::from_str(body.as_str().trim()) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                    None
                }
            })
            .collect();

        let mut products = Vec::new();
        for block in &blocks {
            collect_products(block, &mut products);
        }

        let candidates = products.len();
        let records = products
            .into_iter()
            .filter_map(product_to_draft)
            .map(|draft| ProductRecord::new(draft, ctx))
            .collect();

        Extraction {
            records,
            candidates,
            source: None,
        }
    }
}

/// Depth-first walk collecting every object typed `Product`. Arrays,
/// `@graph` containers and `ItemList` wrappers are all just nested values.
/// A product's own children are not searched (variants, `isRelatedTo`).
fn collect_products<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_products(item, out);
            }
        }
        Value::Object(map) => {
            if is_product(value) {
                out.push(value);
                return;
            }
            for child in map.values() {
                collect_products(child, out);
            }
        }
        _ => {}
    }
}

fn is_product(item: &Value) -> bool {
    let Some(type_node) = item.get("@type") else {
        return false;
    };
    let matches = |s: &str| s.eq_ignore_ascii_case("Product") || s.ends_with("/Product");
    if let Some(s) = type_node.as_str() {
        matches(s)
    } else if let Some(arr) = type_node.as_array() {
        arr.iter().filter_map(Value::as_str).any(matches)
    } else {
        false
    }
}

fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn product_to_draft(item: &Value) -> Option<ProductDraft> {
    let offers = offers_of(item);
    let price = offers.iter().find_map(|o| offer_price(o))?;
    let price_was = offers.iter().find_map(|o| offer_was_price(o));

    let product_url = str_field(item, "url")
        .or_else(|| offers.iter().find_map(|o| str_field(o, "url")))
        .and_then(|u| normalize_url(Some(u)));

    let sku = str_field(item, "sku")
        .or_else(|| str_field(item, "productID"))
        .map(str::to_owned)
        .or_else(|| extract_sku(product_url.as_deref()));

    let availability = offers
        .iter()
        .find_map(|o| str_field(o, "availability"))
        .map(schema_availability)
        .unwrap_or_default();

    Some(ProductDraft {
        sku,
        title: str_field(item, "name")
            .map(collapse_whitespace)
            .unwrap_or_default(),
        price: Some(price),
        price_was,
        availability,
        product_url,
        image_url: image_of(item),
        labels: Vec::new(),
    })
}

/// `offers` may be a single `Offer`/`AggregateOffer` or an array of them.
fn offers_of(item: &Value) -> Vec<&Value> {
    match item.get("offers") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

fn price_specs(offer: &Value) -> Vec<&Value> {
    match offer.get("priceSpecification") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

fn is_was_spec(spec: &Value) -> bool {
    str_field(spec, "priceType").is_some_and(|t| {
        WAS_PRICE_TYPES
            .iter()
            .any(|w| t == *w || t.ends_with(&format!("/{w}")))
    })
}

fn offer_price(offer: &Value) -> Option<Decimal> {
    offer
        .get("price")
        .and_then(parse_price_value)
        .or_else(|| offer.get("lowPrice").and_then(parse_price_value))
        .or_else(|| {
            price_specs(offer)
                .into_iter()
                .filter(|spec| !is_was_spec(spec))
                .find_map(|spec| spec.get("price").and_then(parse_price_value))
        })
}

fn offer_was_price(offer: &Value) -> Option<Decimal> {
    price_specs(offer)
        .into_iter()
        .filter(|spec| is_was_spec(spec))
        .find_map(|spec| spec.get("price").and_then(parse_price_value))
}

/// `image` may be a URL string, an array, or an `ImageObject`.
fn image_of(item: &Value) -> Option<String> {
    fn resolve(node: &Value) -> Option<String> {
        match node {
            Value::String(s) => normalize_image_url(Some(s)),
            Value::Array(list) => list.iter().find_map(resolve),
            Value::Object(_) => str_field(node, "url")
                .or_else(|| str_field(node, "contentUrl"))
                .and_then(|s| normalize_image_url(Some(s))),
            _ => None,
        }
    }
    item.get("image").and_then(resolve)
}
