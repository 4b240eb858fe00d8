use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places kept on `pct_off`.
const PCT_OFF_SCALE: u32 = 4;

/// One observation of one product at one store at one point in time.
///
/// Records are built once by the extractor and handed to a sink by value;
/// nothing mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub store_id: String,
    pub store_name: String,
    pub category: String,
    /// Item number, from structured data or the trailing digits of a
    /// `/pd/` product URL.
    pub sku: Option<String>,
    pub title: String,
    /// Current shelf price in USD.
    pub price: Option<Decimal>,
    /// Pre-discount price. Always `>= price` when present.
    pub price_was: Option<Decimal>,
    /// `(price_was - price) / price_was`, in `[0, 1]`.
    pub pct_off: Option<Decimal>,
    /// Free-text availability as rendered, e.g. `"Pickup Today"`.
    pub availability: String,
    pub clearance: bool,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// `true` only when the pickup-today filter was confirmed active on the
    /// page this record came from. Consumers weight unconfirmed records
    /// accordingly.
    pub pickup_filter_applied: bool,
}

impl ProductRecord {
    /// Build a record from extracted fields plus the page it was captured on.
    ///
    /// Derives `pct_off` and `clearance`. An inconsistent price pair
    /// (`price_was < price`) drops `price_was` so `pct_off` is never negative.
    #[must_use]
    pub fn new(draft: ProductDraft, ctx: &CaptureContext) -> Self {
        let price = draft.price.filter(|p| *p >= Decimal::ZERO);
        let price_was = match (price, draft.price_was) {
            (Some(price), Some(was)) if was < price => None,
            (_, was) => was.filter(|w| *w > Decimal::ZERO),
        };

        let pct_off = match (price, price_was) {
            (Some(price), Some(was)) => Some(((was - price) / was).round_dp(PCT_OFF_SCALE)),
            _ => None,
        };

        let labelled_clearance = draft
            .labels
            .iter()
            .chain(std::iter::once(&draft.availability))
            .chain(std::iter::once(&draft.title))
            .any(|text| text.to_lowercase().contains("clearance"));
        let deep_discount = pct_off.is_some_and(|p| p >= ctx.clearance_min_pct_off);

        Self {
            store_id: ctx.store_id.clone(),
            store_name: ctx.store_name.clone(),
            category: ctx.category.clone(),
            sku: draft.sku.filter(|s| !s.trim().is_empty()),
            title: draft.title,
            price,
            price_was,
            pct_off,
            availability: draft.availability,
            clearance: labelled_clearance || deep_discount,
            product_url: draft.product_url,
            image_url: draft.image_url,
            timestamp: ctx.captured_at,
            pickup_filter_applied: ctx.pickup_filter_applied,
        }
    }

    /// Identity within a single category run: the SKU when known, otherwise
    /// the product URL. `None` means the record cannot be deduplicated.
    #[must_use]
    pub fn identity_key(&self) -> Option<String> {
        self.sku
            .as_ref()
            .map(|sku| format!("sku:{sku}"))
            .or_else(|| self.product_url.as_ref().map(|url| format!("url:{url}")))
    }

    /// Pickup availability in the strong sense: the filter was confirmed.
    #[must_use]
    pub fn is_confirmed_pickup(&self) -> bool {
        self.pickup_filter_applied
    }
}

/// Fields pulled off a page for one product, before store/category context
/// is attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub sku: Option<String>,
    pub title: String,
    pub price: Option<Decimal>,
    pub price_was: Option<Decimal>,
    pub availability: String,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    /// Badge or promo text found near the product (e.g. `"Clearance"`).
    pub labels: Vec<String>,
}

/// Where and when a batch of records was captured.
#[derive(Debug, Clone)]
pub struct CaptureContext {
    pub store_id: String,
    pub store_name: String,
    pub category: String,
    pub pickup_filter_applied: bool,
    pub captured_at: DateTime<Utc>,
    /// Minimum `pct_off` that marks an item as clearance without a label.
    pub clearance_min_pct_off: Decimal,
}
