//! Pins the browser session to one physical store.
//!
//! Listing prices and pickup availability are store-specific, so this runs
//! once per session before any category is scraped. Failure is tolerated:
//! records are still tagged with the target store, and the caller logs it.

use lowes_core::StoreTarget;

use crate::page::PageHandle;
use crate::parse::{collapse_whitespace, SITE_ORIGIN};
use crate::retry::retry_until;
use crate::selectors::{
    first_match, Locator, SET_STORE_LOCATORS, STORE_CARD_CSS, STORE_CHOOSER_LOCATORS,
    ZIP_INPUT_LOCATORS,
};
use crate::settings::ScrapeSettings;

/// Makes `store` the session's "my store". Returns `false` when no attempt
/// could confirm the selection.
pub async fn set_store_context<P>(page: &P, store: &StoreTarget, settings: &ScrapeSettings) -> bool
where
    P: PageHandle + ?Sized,
{
    let set = retry_until(&settings.store_context, move |attempt| async move {
        if let Some(url) = store.url.as_deref() {
            if via_store_page(page, url, settings).await {
                return Some(());
            }
            tracing::debug!(store_id = %store.store_id, attempt, "store page flow failed, trying zip search");
        }
        via_zip_search(page, store, settings).await.then_some(())
    })
    .await
    .is_some();

    if set {
        tracing::info!(store_id = %store.store_id, "store context set");
    } else {
        tracing::warn!(store_id = %store.store_id, zip = %store.zip, "could not set store context");
    }
    set
}

async fn via_store_page<P>(page: &P, url: &str, settings: &ScrapeSettings) -> bool
where
    P: PageHandle + ?Sized,
{
    if let Err(e) = page.navigate(url).await {
        tracing::debug!(url, error = %e, "store page navigation failed");
        return false;
    }
    page.wait_for_network_idle(settings.network_idle_timeout).await;
    click_first(page, SET_STORE_LOCATORS, settings).await
}

async fn via_zip_search<P>(page: &P, store: &StoreTarget, settings: &ScrapeSettings) -> bool
where
    P: PageHandle + ?Sized,
{
    if let Err(e) = page.navigate(SITE_ORIGIN).await {
        tracing::debug!(error = %e, "home page navigation failed");
        return false;
    }
    page.wait_for_network_idle(settings.network_idle_timeout).await;

    if !click_first(page, STORE_CHOOSER_LOCATORS, settings).await {
        tracing::debug!("store chooser not found");
        return false;
    }

    let Some((_, inputs)) = first_match(page, ZIP_INPUT_LOCATORS).await else {
        tracing::debug!("zip input not found");
        return false;
    };
    let Some(input) = inputs.first() else {
        return false;
    };
    if page.type_text(input, &store.zip).await.is_err() || page.press_enter(input).await.is_err() {
        return false;
    }

    if !page
        .wait_for_selector(STORE_CARD_CSS, settings.selector_timeout)
        .await
    {
        tracing::debug!(zip = %store.zip, "no store results rendered");
        return false;
    }
    let cards = match page.query_all(STORE_CARD_CSS).await {
        Ok(cards) if !cards.is_empty() => cards,
        _ => return false,
    };

    let Some(card) = pick_store_card(page, cards, &store.store_id).await else {
        return false;
    };
    for locator in SET_STORE_LOCATORS {
        let Ok(buttons) = page.query_within(&card, locator.css).await else {
            continue;
        };
        for button in buttons {
            let text = page.element_text(&button).await.unwrap_or_default();
            if locator.accepts_text(&text) && page.click(&button).await.is_ok() {
                page.wait_for_network_idle(settings.network_idle_timeout).await;
                return true;
            }
        }
    }
    tracing::debug!(store_id = %store.store_id, "no select control in store card");
    false
}

/// The card whose `data-store-id` or `#1234` label matches, else the first.
async fn pick_store_card<P>(page: &P, cards: Vec<P::Element>, store_id: &str) -> Option<P::Element>
where
    P: PageHandle + ?Sized,
{
    let mut first = None;
    for card in cards {
        if let Ok(Some(id)) = page.element_attribute(&card, "data-store-id").await {
            if id.trim() == store_id {
                return Some(card);
            }
        }
        let text = collapse_whitespace(&page.element_text(&card).await.unwrap_or_default());
        if text_names_store(&text, store_id) {
            return Some(card);
        }
        if first.is_none() {
            first = Some(card);
        }
    }
    first
}

/// `true` when `text` mentions `#<store_id>` as a whole number.
fn text_names_store(text: &str, store_id: &str) -> bool {
    let needle = format!("#{store_id}");
    text.match_indices(&needle).any(|(i, _)| {
        !text[i + needle.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

async fn click_first<P>(page: &P, chain: &[Locator], settings: &ScrapeSettings) -> bool
where
    P: PageHandle + ?Sized,
{
    let Some((_, elements)) = first_match(page, chain).await else {
        return false;
    };
    for element in &elements {
        if page.click(element).await.is_ok() {
            page.wait_for_network_idle(settings.network_idle_timeout).await;
            return true;
        }
    }
    false
}
