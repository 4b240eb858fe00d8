//! Ordered selector strategies for the live-page interactions.
//!
//! Each fallback chain is a slice of [`Locator`]s evaluated front to back.
//! Resolving one yields an explicit [`LocatorMatch`], so the chains can be
//! reordered or extended without touching control flow.

use crate::page::PageHandle;
use crate::parse::collapse_whitespace;

/// How a locator finds its element. Used for logging and for tests that
/// assert which strategy won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Visible label text.
    Text,
    /// ARIA or test-id attributes.
    Aria,
    /// Form inputs identified by id/name fragments.
    InputId,
    /// Plain structural CSS.
    Css,
}

#[derive(Debug, Clone, Copy)]
pub struct Locator {
    pub strategy: Strategy,
    pub css: &'static str,
    /// When non-empty, an element only matches if its visible text contains
    /// one of these (case-insensitive).
    pub text_any_of: &'static [&'static str],
}

impl Locator {
    #[must_use]
    pub const fn css(strategy: Strategy, css: &'static str) -> Self {
        Self {
            strategy,
            css,
            text_any_of: &[],
        }
    }

    #[must_use]
    pub const fn text(css: &'static str, text_any_of: &'static [&'static str]) -> Self {
        Self {
            strategy: Strategy::Text,
            css,
            text_any_of,
        }
    }

    /// `true` if `text` satisfies this locator's text constraint.
    #[must_use]
    pub fn accepts_text(&self, text: &str) -> bool {
        if self.text_any_of.is_empty() {
            return true;
        }
        let lower = collapse_whitespace(text).to_lowercase();
        self.text_any_of.iter().any(|needle| lower.contains(needle))
    }
}

/// Result of evaluating one locator.
pub enum LocatorMatch<E> {
    Matched {
        locator: Locator,
        elements: Vec<E>,
    },
    NotMatched {
        locator: Locator,
    },
}

impl<E> LocatorMatch<E> {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, LocatorMatch::Matched { .. })
    }

    #[must_use]
    pub fn into_elements(self) -> Vec<E> {
        match self {
            LocatorMatch::Matched { elements, .. } => elements,
            LocatorMatch::NotMatched { .. } => Vec::new(),
        }
    }
}

/// Evaluate a single locator. Query errors count as "not matched".
pub async fn resolve<P>(page: &P, locator: Locator) -> LocatorMatch<P::Element>
where
    P: PageHandle + ?Sized,
{
    let candidates = match page.query_all(locator.css).await {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(css = locator.css, error = %e, "locator query failed");
            return LocatorMatch::NotMatched { locator };
        }
    };

    let mut elements = Vec::with_capacity(candidates.len());
    for element in candidates {
        if locator.text_any_of.is_empty() {
            elements.push(element);
            continue;
        }
        let text = page.element_text(&element).await.unwrap_or_default();
        if locator.accepts_text(&text) {
            elements.push(element);
        }
    }

    if elements.is_empty() {
        LocatorMatch::NotMatched { locator }
    } else {
        LocatorMatch::Matched { locator, elements }
    }
}

/// Evaluate `chain` in order and return the first match.
pub async fn first_match<P>(page: &P, chain: &[Locator]) -> Option<(Locator, Vec<P::Element>)>
where
    P: PageHandle + ?Sized,
{
    for locator in chain {
        if let LocatorMatch::Matched { locator, elements } = resolve(page, *locator).await {
            return Some((locator, elements));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Site tables
// ---------------------------------------------------------------------------

/// Product tiles on a listing page, most specific first. Shared by the DOM
/// extractor and the pickup filter's product-count signal.
pub const PRODUCT_CARD_CSS: &[&str] = &[
    r#"[data-testid="product-pod"]"#,
    r#"[data-selector="splp-prd-lst-itm"]"#,
    "div.product-card",
    "li.product-card",
];

/// The "Pickup Today" refinement control.
pub const PICKUP_FILTER_LOCATORS: &[Locator] = &[
    Locator::text(
        r#"label, button, a, [role="checkbox"], [role="switch"]"#,
        &["pickup today", "get it today", "available today"],
    ),
    Locator::css(
        Strategy::Aria,
        r#"[aria-label*="Pickup"], [aria-label*="pickup"], [data-testid*="pickup"]"#,
    ),
    Locator::css(
        Strategy::InputId,
        r#"input[id*="pickup"], input[id*="Pickup"], input[name*="pickup"], input[value*="pickup"]"#,
    ),
];

/// Collapsed facet groups that hide the availability controls.
pub const FILTER_EXPANDER_LOCATORS: &[Locator] = &[
    Locator::text(
        r#"button[aria-expanded="false"]"#,
        &["availability", "get it fast", "pickup"],
    ),
    Locator::css(
        Strategy::Aria,
        r#"[data-testid="filter-availability"] button[aria-expanded="false"]"#,
    ),
];

/// Query-string fragments that show the availability refinement is active.
pub const PICKUP_URL_MARKERS: &[&str] = &["pickup", "availability", "instock", "inventory=1"];

/// Opens the store chooser from the site header.
pub const STORE_CHOOSER_LOCATORS: &[Locator] = &[
    Locator::css(
        Strategy::Aria,
        r#"[data-testid="store-chooser"], [data-testid="header-store"], button[aria-label*="store"], button[aria-label*="Store"]"#,
    ),
    Locator::text("button, a", &["find a store", "select a store", "my store"]),
];

/// Zip/city search box inside the store chooser.
pub const ZIP_INPUT_LOCATORS: &[Locator] = &[
    Locator::css(
        Strategy::InputId,
        r#"input[name*="zip"], input[id*="zip"], input[name*="Zip"], input[id*="Zip"]"#,
    ),
    Locator::css(
        Strategy::Aria,
        r#"input[placeholder*="ZIP"], input[placeholder*="Zip"], input[aria-label*="ZIP"], input[aria-label*="zip"]"#,
    ),
    Locator::css(Strategy::Css, r#"input[type="search"]"#),
];

/// Result cards rendered after a zip search.
pub const STORE_CARD_CSS: &str =
    r#"[data-testid="store-card"], [data-store-id], li.store-list-item, div.store-card"#;

/// "Set as my store" style controls, either page-level or inside a card.
pub const SET_STORE_LOCATORS: &[Locator] = &[
    Locator::text(
        r#"button, a, [role="button"]"#,
        &[
            "set as my store",
            "make this my store",
            "set store",
            "select store",
            "shop this store",
        ],
    ),
    Locator::css(
        Strategy::Aria,
        r#"[data-testid="set-store-button"], [aria-label*="my store"]"#,
    ),
];
