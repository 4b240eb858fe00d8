//! Product-card extraction from the rendered listing grid.

use std::sync::LazyLock;

use lowes_core::{CaptureContext, ProductDraft, ProductRecord};
use scraper::{ElementRef, Html, Selector};

use super::{Extraction, ProductSource};
use crate::parse::{
    collapse_whitespace, extract_sku, indicates_pickup, normalize_image_url, normalize_url,
    parse_price,
};
use crate::selectors::PRODUCT_CARD_CSS;

fn compile(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

static CARD: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(PRODUCT_CARD_CSS));

static TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        r#"[data-selector="splp-prd-title"]"#,
        r#"[data-testid="item-description"]"#,
        ".product-title",
        "h3",
        r#"a[href*="/pd/"]"#,
    ])
});

static PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        r#"[data-testid="current-price"]"#,
        r#"[data-selector="splp-prd-act-$"]"#,
        ".price-current",
        ".price",
    ])
});

/// Secondary price markup used on sale and "starting at" tiles.
static PRICE_ALT: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        r#"[data-testid="sale-price"]"#,
        r#"[aria-label*="price"]"#,
        "[data-price]",
    ])
});

static WAS_PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        r#"[data-testid="was-price"]"#,
        ".was-price",
        "s",
        "del",
    ])
});

static AVAILABILITY: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[
        r#"[data-testid="fulfillment-availability"]"#,
        r#"[data-testid="availability"]"#,
        ".fulfillment",
        ".availability",
    ])
});

static LINK: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile(&[r#"a[href*="/pd/"]"#, "a[href]"]));

static IMAGE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&["img"]));

static LABELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    compile(&[r#"[data-testid="badge"]"#, ".badge", ".promo-label"])
});

/// Rendered-card source. When the pickup filter is not confirmed, only cards
/// whose own availability text promises pickup are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomCardSource;

impl ProductSource for DomCardSource {
    fn name(&self) -> &'static str {
        "dom-card"
    }

    fn extract(&self, html: &str, ctx: &CaptureContext) -> Extraction {
        let document = Html::parse_document(html);
        let cards = find_cards(&document);
        let candidates = cards.len();

        let mut records = Vec::new();
        for card in cards {
            let Some(draft) = card_to_draft(card) else {
                continue;
            };
            if !ctx.pickup_filter_applied && !indicates_pickup(&draft.availability) {
                continue;
            }
            records.push(ProductRecord::new(draft, ctx));
        }

        Extraction {
            records,
            candidates,
            source: None,
        }
    }
}

/// Cards from the first card selector that matches anything, so nested
/// wrappers are never counted twice.
fn find_cards(document: &Html) -> Vec<ElementRef<'_>> {
    CARD.iter()
        .map(|sel| document.select(sel).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default()
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// First non-empty text under `card` from an ordered selector list.
fn first_text(card: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|sel| card.select(sel))
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn first_attr(card: ElementRef<'_>, selectors: &[Selector], attrs: &[&str]) -> Option<String> {
    selectors.iter().flat_map(|sel| card.select(sel)).find_map(|el| {
        attrs
            .iter()
            .filter_map(|a| el.value().attr(a))
            .map(str::trim)
            .find(|v| !v.is_empty() && !v.starts_with("data:"))
            .map(str::to_owned)
    })
}

fn card_price(card: ElementRef<'_>) -> Option<rust_decimal::Decimal> {
    PRICE
        .iter()
        .chain(PRICE_ALT.iter())
        .flat_map(|sel| card.select(sel))
        .find_map(|el| {
            parse_price(Some(&element_text(el))).or_else(|| {
                ["data-price", "content"]
                    .iter()
                    .find_map(|a| parse_price(el.value().attr(a)))
            })
        })
}

fn card_to_draft(card: ElementRef<'_>) -> Option<ProductDraft> {
    let price = card_price(card)?;
    let price_was = first_text(card, &WAS_PRICE).and_then(|t| parse_price(Some(&t)));

    let product_url = first_attr(card, &LINK, &["href"]).and_then(|h| normalize_url(Some(&h)));
    let sku = ["data-itemid", "data-item-id", "data-sku", "data-productid"]
        .iter()
        .filter_map(|a| card.value().attr(a))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_owned)
        .or_else(|| extract_sku(product_url.as_deref()));

    let image_url = first_attr(card, &IMAGE, &["src", "data-src", "srcset"])
        .and_then(|src| normalize_image_url(Some(&src)));

    let labels = LABELS
        .iter()
        .flat_map(|sel| card.select(sel))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    Some(ProductDraft {
        sku,
        title: first_text(card, &TITLE).unwrap_or_default(),
        price: Some(price),
        price_was,
        availability: first_text(card, &AVAILABILITY).unwrap_or_default(),
        product_url,
        image_url,
        labels,
    })
}
