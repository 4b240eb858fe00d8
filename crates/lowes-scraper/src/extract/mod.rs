//! Product record extraction from listing-page HTML.
//!
//! Sources are tried in priority order: embedded schema.org JSON-LD first,
//! then rendered product cards. The first source that yields at least one
//! record wins. Extraction never fails; unusable entries are dropped.

mod dom;
mod jsonld;

pub use dom::DomCardSource;
pub use jsonld::JsonLdSource;

use lowes_core::{CaptureContext, ProductRecord};

/// A strategy for turning page HTML into product records.
pub trait ProductSource: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    fn extract(&self, html: &str, ctx: &CaptureContext) -> Extraction;
}

/// Records from one page plus how many product entries were seen before
/// validity gates (missing price, pickup text) were applied.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<ProductRecord>,
    pub candidates: usize,
    /// Which source produced `records`; `None` when nothing was extracted.
    pub source: Option<&'static str>,
}

impl Extraction {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs the default source chain over `html`.
#[must_use]
pub fn extract_products(html: &str, ctx: &CaptureContext) -> Extraction {
    extract_with(&[&JsonLdSource, &DomCardSource], html, ctx)
}

/// Runs `sources` in order and returns the first non-empty extraction.
///
/// When every source comes back empty the result carries the largest
/// candidate count seen, so a page full of unpriced cards still counts as
/// a full page for the stop heuristic.
#[must_use]
pub fn extract_with(
    sources: &[&dyn ProductSource],
    html: &str,
    ctx: &CaptureContext,
) -> Extraction {
    let mut candidates = 0;
    for source in sources {
        let extraction = source.extract(html, ctx);
        if !extraction.is_empty() {
            tracing::debug!(
                source = source.name(),
                records = extraction.records.len(),
                candidates = extraction.candidates,
                "extracted products"
            );
            return Extraction {
                source: Some(source.name()),
                ..extraction
            };
        }
        candidates = candidates.max(extraction.candidates);
    }
    Extraction {
        records: Vec::new(),
        candidates,
        source: None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::str::FromStr;

    use chrono::Utc;
    use lowes_core::CaptureContext;
    use rust_decimal::Decimal;

    pub fn ctx(filter_applied: bool) -> CaptureContext {
        CaptureContext {
            store_id: "1845".to_string(),
            store_name: "Lowe's of Greenville".to_string(),
            category: "Paint".to_string(),
            pickup_filter_applied: filter_applied,
            captured_at: Utc::now(),
            clearance_min_pct_off: Decimal::from_str("0.25").unwrap(),
        }
    }
}
