//! Engages and verifies the "Pickup Today" availability refinement.
//!
//! A click alone proves nothing: the site re-renders facets asynchronously
//! and sometimes swallows the first click. Each round therefore re-reads the
//! page and accepts the filter only when an independent signal confirms it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::page::PageHandle;
use crate::retry::{retry_until, RetryPolicy};
use crate::selectors::{
    first_match, resolve, LocatorMatch, FILTER_EXPANDER_LOCATORS, PICKUP_FILTER_LOCATORS,
    PICKUP_URL_MARKERS, PRODUCT_CARD_CSS,
};

#[derive(Debug, Clone)]
pub struct PickupFilterSettings {
    /// Round budget and the jittered wait between failed rounds.
    pub retry: RetryPolicy,
    /// Upper bound on the post-click network-idle wait.
    pub network_idle_timeout: Duration,
    /// Candidates with more visible text than this are containers, not the
    /// control itself.
    pub max_candidate_text_len: usize,
}

impl Default for PickupFilterSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(3, Duration::from_secs(1))
                .with_jitter(Duration::from_millis(750)),
            network_idle_timeout: Duration::from_secs(5),
            max_candidate_text_len: 120,
        }
    }
}

/// Which observation confirmed the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationSignal {
    /// Control or URL showed the filter on before any click this round.
    AlreadySelected,
    /// Control reports checked/selected after the click.
    ElementState,
    /// The URL gained an availability refinement.
    UrlMarkers,
    /// The number of product cards changed.
    ProductCountChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupFilterResult {
    pub verified: bool,
    /// Clicks issued across all rounds.
    pub clicks: u32,
    pub signal: Option<VerificationSignal>,
}

/// `true` when `url` carries one of the availability refinement markers.
#[must_use]
pub fn url_has_pickup_markers(url: &str) -> bool {
    let lower = url.to_lowercase();
    let query = lower.split_once('?').map_or("", |(_, q)| q);
    PICKUP_URL_MARKERS.iter().any(|m| query.contains(m))
}

/// Tries to switch the pickup filter on and confirm it.
///
/// Never fails: an unverified result is a normal outcome that downstream
/// extraction records as `pickup_filter_applied = false`.
pub async fn apply_pickup_filter<P>(page: &P, settings: &PickupFilterSettings) -> PickupFilterResult
where
    P: PageHandle + ?Sized,
{
    let clicks = AtomicU32::new(0);
    let counter = &clicks;
    let signal = retry_until(&settings.retry, move |round| async move {
        run_round(page, settings, round, counter).await
    })
    .await;

    let result = PickupFilterResult {
        verified: signal.is_some(),
        clicks: clicks.load(Ordering::Relaxed),
        signal,
    };
    if result.verified {
        tracing::debug!(clicks = result.clicks, signal = ?result.signal, "pickup filter verified");
    } else {
        tracing::warn!(clicks = result.clicks, "pickup filter could not be verified");
    }
    result
}

async fn run_round<P>(
    page: &P,
    settings: &PickupFilterSettings,
    round: u32,
    clicks: &AtomicU32,
) -> Option<VerificationSignal>
where
    P: PageHandle + ?Sized,
{
    expand_filter_sections(page, settings.network_idle_timeout).await;

    let url_before = page.current_url().await.unwrap_or_default();
    if url_has_pickup_markers(&url_before) {
        return Some(VerificationSignal::AlreadySelected);
    }

    let candidates = find_candidates(page, settings.max_candidate_text_len).await;
    if candidates.is_empty() {
        tracing::debug!(round, "no pickup filter control found");
        return None;
    }
    for target in &candidates {
        if is_selected(page, target).await {
            return Some(VerificationSignal::AlreadySelected);
        }
    }

    for (index, target) in candidates.iter().enumerate() {
        if let Some(signal) = click_and_verify(page, settings, target, clicks).await {
            return Some(signal);
        }
        tracing::debug!(round, candidate = index, "pickup filter click had no visible effect");
        // Handles from before a navigation are stale; the next round re-resolves.
        if page.current_url().await.unwrap_or_default() != url_before {
            break;
        }
    }
    None
}

/// Clicks one candidate and checks the three confirmation signals in order.
async fn click_and_verify<P>(
    page: &P,
    settings: &PickupFilterSettings,
    target: &P::Element,
    clicks: &AtomicU32,
) -> Option<VerificationSignal>
where
    P: PageHandle + ?Sized,
{
    let cards_before = count_product_cards(page).await;
    if let Err(e) = page.click(target).await {
        tracing::debug!(error = %e, "click on pickup filter candidate failed");
        return None;
    }
    clicks.fetch_add(1, Ordering::Relaxed);
    page.wait_for_network_idle(settings.network_idle_timeout).await;

    if is_selected(page, target).await {
        return Some(VerificationSignal::ElementState);
    }
    let url_after = page.current_url().await.unwrap_or_default();
    if url_has_pickup_markers(&url_after) {
        return Some(VerificationSignal::UrlMarkers);
    }
    if count_product_cards(page).await != cards_before {
        return Some(VerificationSignal::ProductCountChanged);
    }
    None
}

/// Opens collapsed availability facets so the control is in the DOM.
async fn expand_filter_sections<P>(page: &P, idle: Duration)
where
    P: PageHandle + ?Sized,
{
    let Some((_, toggles)) = first_match(page, FILTER_EXPANDER_LOCATORS).await else {
        return;
    };
    let mut expanded = false;
    for toggle in &toggles {
        if page.click(toggle).await.is_ok() {
            expanded = true;
        }
    }
    if expanded {
        page.wait_for_network_idle(idle).await;
    }
}

/// Every control the locator chain finds, in strategy order (text, then
/// ARIA, then input id), minus containers whose text is too long to be the
/// control itself.
async fn find_candidates<P>(page: &P, max_text_len: usize) -> Vec<P::Element>
where
    P: PageHandle + ?Sized,
{
    let mut candidates = Vec::new();
    for locator in PICKUP_FILTER_LOCATORS {
        let LocatorMatch::Matched { elements, locator } = resolve(page, *locator).await else {
            continue;
        };
        for element in elements {
            let text = page.element_text(&element).await.unwrap_or_default();
            if text.trim().chars().count() > max_text_len {
                continue;
            }
            tracing::trace!(strategy = ?locator.strategy, "pickup filter candidate");
            candidates.push(element);
        }
    }
    candidates
}

/// Number of product cards under the first card selector that matches.
pub(crate) async fn count_product_cards<P>(page: &P) -> usize
where
    P: PageHandle + ?Sized,
{
    for css in PRODUCT_CARD_CSS {
        match page.query_all(css).await {
            Ok(found) if !found.is_empty() => return found.len(),
            _ => {}
        }
    }
    0
}

const SELECTED_STATES: &[&str] = &["checked", "on", "active", "selected", "true"];
const SELECTED_CLASSES: &[&str] = &["selected", "active", "checked", "is-selected", "is-active"];

async fn is_selected<P>(page: &P, element: &P::Element) -> bool
where
    P: PageHandle + ?Sized,
{
    for attr in ["aria-checked", "aria-pressed", "aria-selected"] {
        if let Ok(Some(v)) = page.element_attribute(element, attr).await {
            if v.eq_ignore_ascii_case("true") {
                return true;
            }
        }
    }
    if let Ok(Some(_)) = page.element_attribute(element, "checked").await {
        return true;
    }
    if let Ok(Some(state)) = page.element_attribute(element, "data-state").await {
        if SELECTED_STATES.contains(&state.to_lowercase().as_str()) {
            return true;
        }
    }
    if let Ok(Some(class)) = page.element_attribute(element, "class").await {
        if class_marks_selected(&class) {
            return true;
        }
    }
    page.is_checked(element).await.unwrap_or(false)
}

fn class_marks_selected(class: &str) -> bool {
    class
        .split_whitespace()
        .any(|word| SELECTED_CLASSES.contains(&word.to_lowercase().as_str()))
}
