//! The per-category pagination loop.
//!
//! Each iteration walks `Fetching -> Checking -> Filtering -> Extracting ->
//! Deciding` for one listing offset. Records are pushed to the sink as soon
//! as a page is decided, so a block or abort later on never loses them.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lowes_core::{CaptureContext, CategoryTarget, ProductRecord, StoreTarget};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::detect::{self, PageStatus};
use crate::error::{PageError, ScraperError};
use crate::extract::extract_products;
use crate::page::{NavigationResponse, PageHandle};
use crate::pagination::{offset_for, page_url, strip_offset};
use crate::pickup::{apply_pickup_filter, url_has_pickup_markers};
use crate::retry::retry_with_backoff;
use crate::settings::ScrapeSettings;
use crate::sink::RecordSink;

/// How a single navigation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    Blocked,
    /// Still crashed after every allowed reload.
    Crashed,
    /// Non-2xx response or navigation failure without block content.
    HttpError,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFetchOutcome {
    pub status: FetchStatus,
    pub http_status: Option<u16>,
}

impl PageFetchOutcome {
    fn new(status: FetchStatus, http_status: Option<u16>) -> Self {
        Self {
            status,
            http_status,
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// Fewer product entries than `min_products`.
    LastPage,
    /// Zero-new streak reached its limit.
    NoNewRecords,
    MaxPages,
    Blocked,
    /// A page could not be loaded after retries and reloads.
    FetchFailed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryOutcome {
    Completed,
    Blocked,
    ExhaustedRetries,
    Aborted,
}

impl From<StopReason> for CategoryOutcome {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::LastPage | StopReason::NoNewRecords | StopReason::MaxPages => {
                CategoryOutcome::Completed
            }
            StopReason::Blocked => CategoryOutcome::Blocked,
            StopReason::FetchFailed => CategoryOutcome::ExhaustedRetries,
            StopReason::Aborted => CategoryOutcome::Aborted,
        }
    }
}

/// Summary of one (store, category) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub store_id: String,
    pub category: String,
    pub outcome: CategoryOutcome,
    pub stop_reason: StopReason,
    pub pages_visited: u32,
    pub records_emitted: usize,
    pub filter_verified_pages: u32,
    pub filter_unverified_pages: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CategoryReport {
    fn start(store: &StoreTarget, category: &CategoryTarget) -> Self {
        let now = Utc::now();
        Self {
            store_id: store.store_id.clone(),
            category: category.name.clone(),
            outcome: CategoryOutcome::Completed,
            stop_reason: StopReason::LastPage,
            pages_visited: 0,
            records_emitted: 0,
            filter_verified_pages: 0,
            filter_unverified_pages: 0,
            started_at: now,
            finished_at: now,
        }
    }

    fn finish(mut self, reason: StopReason) -> Self {
        self.stop_reason = reason;
        self.outcome = reason.into();
        self.finished_at = Utc::now();
        self
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.outcome == CategoryOutcome::Blocked
    }
}

/// Counters the stop heuristic looks at after each page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTally {
    pub candidates: usize,
    pub new_records: usize,
    pub zero_new_streak: u32,
    pub pages_visited: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop(StopReason),
}

/// Whether to fetch the next offset.
#[must_use]
pub fn decide(tally: &PageTally, settings: &ScrapeSettings) -> Decision {
    if tally.candidates < settings.min_products {
        return Decision::Stop(StopReason::LastPage);
    }
    if settings.max_zero_new_streak > 0 && tally.zero_new_streak >= settings.max_zero_new_streak {
        return Decision::Stop(StopReason::NoNewRecords);
    }
    if tally.pages_visited >= settings.max_pages {
        return Decision::Stop(StopReason::MaxPages);
    }
    Decision::Continue
}

/// Navigates to `url`, then classifies the result, reloading a crashed
/// renderer up to `crash_retries` times.
pub async fn fetch_page<P>(page: &P, url: &str, settings: &ScrapeSettings) -> PageFetchOutcome
where
    P: PageHandle + ?Sized,
{
    let navigated = retry_with_backoff(&settings.navigation, move |attempt| async move {
        if attempt > 0 {
            tracing::debug!(url, attempt, "retrying navigation");
        }
        page.navigate(url).await
    })
    .await;

    let mut response = match navigated {
        Ok(response) => response,
        Err(PageError::Timeout { .. }) => {
            tracing::warn!(url, "navigation timed out");
            return PageFetchOutcome::new(FetchStatus::Timeout, None);
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "navigation failed");
            return PageFetchOutcome::new(FetchStatus::HttpError, None);
        }
    };
    page.wait_for_network_idle(settings.network_idle_timeout).await;

    let (status, reloaded) = reload_while_crashed(page, url, settings).await;
    if let Some(r) = reloaded {
        response = r;
    }

    let fetch_status = match status {
        PageStatus::Blocked => FetchStatus::Blocked,
        PageStatus::Crashed => FetchStatus::Crashed,
        PageStatus::Ok if !response.is_success() => FetchStatus::HttpError,
        PageStatus::Ok => FetchStatus::Ok,
    };
    PageFetchOutcome::new(fetch_status, response.http_status)
}

/// Inspects the current page, reloading a crashed renderer up to
/// `crash_retries` times. Also returns the last successful reload response.
async fn reload_while_crashed<P>(
    page: &P,
    url: &str,
    settings: &ScrapeSettings,
) -> (PageStatus, Option<NavigationResponse>)
where
    P: PageHandle + ?Sized,
{
    let mut status = detect::inspect(page).await;
    let mut last = None;
    let mut reloads = 0;
    while status == PageStatus::Crashed && reloads < settings.crash_retries {
        reloads += 1;
        tracing::warn!(url, reloads, "renderer crashed, reloading");
        match page.reload().await {
            Ok(r) => last = Some(r),
            Err(e) => tracing::debug!(url, error = %e, "reload failed"),
        }
        page.wait_for_network_idle(settings.network_idle_timeout).await;
        status = detect::inspect(page).await;
    }
    (status, last)
}

fn is_aborted(abort: Option<&watch::Receiver<bool>>) -> bool {
    abort.is_some_and(|rx| *rx.borrow())
}

/// Sleeps for `delay`, returning early if the abort flag flips.
async fn pause(delay: Duration, abort: Option<&watch::Receiver<bool>>) {
    if delay.is_zero() {
        return;
    }
    match abort {
        Some(rx) => {
            let mut rx = rx.clone();
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                Ok(_) = rx.wait_for(|flag| *flag) => {}
            }
        }
        None => tokio::time::sleep(delay).await,
    }
}

/// Scrapes every listing page of `category` at `store` into `sink`.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if the category URL cannot be
/// paginated, or [`ScraperError::Sink`] if records cannot be written.
/// Page-level failures never surface here; they end the loop with the
/// matching [`CategoryOutcome`].
pub async fn scrape_category<P, S>(
    page: &P,
    store: &StoreTarget,
    category: &CategoryTarget,
    settings: &ScrapeSettings,
    sink: &mut S,
    abort: Option<&watch::Receiver<bool>>,
) -> Result<CategoryReport, ScraperError>
where
    P: PageHandle + ?Sized,
    S: RecordSink + ?Sized,
{
    let mut report = CategoryReport::start(store, category);
    let mut base_url = category.url.clone();
    let mut seen: HashSet<String> = HashSet::new();
    let mut zero_new_streak = 0u32;
    let mut page_index = 0u32;

    let reason = loop {
        if is_aborted(abort) {
            tracing::info!(store_id = %store.store_id, category = %category.name, "abort requested");
            break StopReason::Aborted;
        }

        let offset = offset_for(page_index, settings.page_size);
        let url = page_url(&base_url, offset)?;

        // Fetching + Checking
        let fetched = fetch_page(page, &url, settings).await;
        report.pages_visited += 1;
        match fetched.status {
            FetchStatus::Ok => {}
            FetchStatus::Blocked => {
                tracing::warn!(store_id = %store.store_id, url = %url, "blocked, abandoning category");
                break StopReason::Blocked;
            }
            FetchStatus::Crashed | FetchStatus::HttpError | FetchStatus::Timeout => {
                tracing::warn!(
                    store_id = %store.store_id,
                    url = %url,
                    status = ?fetched.status,
                    http_status = ?fetched.http_status,
                    "page could not be fetched, treating as empty"
                );
                break StopReason::FetchFailed;
            }
        }

        // Filtering
        let before_filter = page.current_url().await.unwrap_or_default();
        let filter = apply_pickup_filter(page, &settings.pickup).await;
        let after_filter = page.current_url().await.unwrap_or_default();
        if filter.clicks > 0 || after_filter != before_filter {
            match reload_while_crashed(page, &after_filter, settings).await.0 {
                PageStatus::Ok => {}
                PageStatus::Blocked => {
                    tracing::warn!(
                        store_id = %store.store_id,
                        url = %after_filter,
                        "blocked after filtering, abandoning category"
                    );
                    break StopReason::Blocked;
                }
                PageStatus::Crashed => {
                    tracing::warn!(
                        store_id = %store.store_id,
                        url = %after_filter,
                        "renderer crashed after filtering"
                    );
                    break StopReason::FetchFailed;
                }
            }
        }
        if filter.verified {
            report.filter_verified_pages += 1;
            if let Some(adopted) = adoptable_base(page, &base_url).await {
                tracing::info!(base_url = %adopted, "adopting filtered listing URL");
                base_url = adopted;
            }
        } else {
            report.filter_unverified_pages += 1;
        }

        // Extracting
        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(error = %e, "could not read page content");
                String::new()
            }
        };
        let ctx = CaptureContext {
            store_id: store.store_id.clone(),
            store_name: store.name.clone(),
            category: category.name.clone(),
            pickup_filter_applied: filter.verified,
            captured_at: Utc::now(),
            clearance_min_pct_off: settings.clearance_min_pct_off,
        };
        let extraction = extract_products(&html, &ctx);

        // Deciding
        let fresh = dedupe(extraction.records, &mut seen);
        let new_records = fresh.len();
        if new_records > 0 {
            sink.push(fresh).await?;
            report.records_emitted += new_records;
            zero_new_streak = 0;
        } else {
            zero_new_streak += 1;
        }
        tracing::info!(
            store_id = %store.store_id,
            category = %category.name,
            offset,
            candidates = extraction.candidates,
            new_records,
            filter_verified = filter.verified,
            source = extraction.source.unwrap_or("none"),
            "page processed"
        );

        let tally = PageTally {
            candidates: extraction.candidates,
            new_records,
            zero_new_streak,
            pages_visited: report.pages_visited,
        };
        if let Decision::Stop(reason) = decide(&tally, settings) {
            break reason;
        }

        pause(settings.pacing_delay(), abort).await;
        page_index += 1;
    };

    let report = report.finish(reason);
    tracing::info!(
        store_id = %report.store_id,
        category = %report.category,
        outcome = ?report.outcome,
        stop_reason = ?report.stop_reason,
        pages = report.pages_visited,
        records = report.records_emitted,
        "category finished"
    );
    Ok(report)
}

/// The current URL, minus its offset, when it carries the pickup refinement
/// and differs from `base_url`.
async fn adoptable_base<P>(page: &P, base_url: &str) -> Option<String>
where
    P: PageHandle + ?Sized,
{
    let current = page.current_url().await.ok()?;
    if !url_has_pickup_markers(&current) {
        return None;
    }
    let stripped = strip_offset(&current).ok()?;
    (stripped != base_url).then_some(stripped)
}

/// Keeps records whose identity key has not been seen in this category.
/// Records with neither SKU nor URL cannot be compared and are kept.
fn dedupe(records: Vec<ProductRecord>, seen: &mut HashSet<String>) -> Vec<ProductRecord> {
    records
        .into_iter()
        .filter(|r| r.identity_key().is_none_or(|key| seen.insert(key)))
        .collect()
}
