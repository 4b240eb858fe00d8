//! Offset-based listing URLs.
//!
//! Listing pages are addressed by an `offset` query parameter counting
//! products, not pages: page `n` of size `s` lives at `offset = n * s`.

use url::Url;

use crate::error::ScraperError;

const OFFSET_PARAM: &str = "offset";

/// Returns `base` with its `offset` parameter set to `offset`.
///
/// Any existing `offset` is replaced; every other query parameter (including
/// an adopted pickup refinement) is preserved in order. Offset zero drops the
/// parameter so the first page keeps its canonical URL.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `base` is not an absolute URL.
pub fn page_url(base: &str, offset: u32) -> Result<String, ScraperError> {
    let mut url = Url::parse(base).map_err(|e| ScraperError::InvalidUrl {
        url: base.to_owned(),
        reason: e.to_string(),
    })?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != OFFSET_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() && offset == 0 {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        if offset > 0 {
            pairs.append_pair(OFFSET_PARAM, &offset.to_string());
        }
    }
    Ok(url.into())
}

/// `base` with any `offset` parameter removed. Used when adopting the
/// post-filter URL as the base for later pages.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `base` is not an absolute URL.
pub fn strip_offset(base: &str) -> Result<String, ScraperError> {
    page_url(base, 0)
}

/// Offset of zero-based page `page_index`, saturating on overflow.
#[must_use]
pub fn offset_for(page_index: u32, page_size: u32) -> u32 {
    page_index.saturating_mul(page_size)
}
