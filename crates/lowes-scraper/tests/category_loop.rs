//! End-to-end pagination loop tests against scripted listing pages.

mod common;

use common::{
    card_listing, jsonld_listing, paint, settings, store, ClickEffect, FakePage, FakeResponse,
    BLOCK_PAGE, CRASH_PAGE, PAINT_URL,
};
use lowes_scraper::{scrape_category, CategoryOutcome, MemorySink, StopReason};
use tokio::sync::watch;

fn offset_url(offset: u32) -> String {
    format!("{PAINT_URL}?offset={offset}")
}

// ---------------------------------------------------------------------------
// Normal termination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_page_then_short_page_collects_everything() {
    let page = FakePage::new()
        .route(PAINT_URL, FakeResponse::ok(jsonld_listing(1000, 24)))
        .route(&offset_url(24), FakeResponse::ok(jsonld_listing(2000, 3)))
        .on_click("pickup today", ClickEffect::Check);
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.outcome, CategoryOutcome::Completed);
    assert_eq!(report.stop_reason, StopReason::LastPage);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records_emitted, 27);
    assert_eq!(report.filter_verified_pages, 2);

    let records = sink.records();
    assert_eq!(records.len(), 27);
    assert!(records.iter().all(|r| r.pickup_filter_applied));
    assert!(records.iter().all(|r| r.store_id == "1845" && r.category == "Paint"));
    assert_eq!(page.navigations(), vec![PAINT_URL.to_string(), offset_url(24)]);
}

#[tokio::test]
async fn unverified_filter_keeps_only_cards_showing_pickup() {
    let mut pickup = vec![false; 20];
    for i in [0, 4, 9, 13, 19] {
        pickup[i] = true;
    }
    let page = FakePage::new().route(PAINT_URL, FakeResponse::ok(card_listing(5000, &pickup)));
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| !r.pickup_filter_applied));
    assert!(records
        .iter()
        .all(|r| r.availability.to_lowercase().contains("pickup")));
    assert_eq!(report.outcome, CategoryOutcome::Completed);
    assert_eq!(report.filter_unverified_pages, report.pages_visited);
}

#[tokio::test]
async fn repeated_pages_stop_after_zero_new_streak() {
    // Site ignores the offset and serves the same 24 products forever.
    let listing = FakeResponse::ok(jsonld_listing(1000, 24));
    let page = FakePage::new()
        .route(PAINT_URL, listing.clone())
        .route(&offset_url(24), listing.clone())
        .route(&offset_url(48), listing.clone())
        .route(&offset_url(72), listing)
        .on_click("pickup today", ClickEffect::Check);
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::NoNewRecords);
    assert_eq!(report.outcome, CategoryOutcome::Completed);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(sink.records().len(), 24);
    assert!(!page.navigations().contains(&offset_url(72)));
}

#[tokio::test]
async fn max_pages_caps_the_walk() {
    let mut page = FakePage::new().on_click("pickup today", ClickEffect::Check);
    page = page.route(PAINT_URL, FakeResponse::ok(jsonld_listing(0, 24)));
    for i in 1..5u32 {
        page = page.route(
            &offset_url(i * 24),
            FakeResponse::ok(jsonld_listing(u64::from(i) * 100, 24)),
        );
    }
    let mut config = settings();
    config.max_pages = 3;
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &config, &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::MaxPages);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(sink.records().len(), 72);
}

#[tokio::test]
async fn adopted_filter_url_carries_through_pagination() {
    let filtered = format!("{PAINT_URL}?availability=pickup");
    let page = FakePage::new()
        .route(PAINT_URL, FakeResponse::ok(jsonld_listing(1000, 24)))
        .route(&filtered, FakeResponse::ok(jsonld_listing(1000, 24)))
        .route(
            &format!("{filtered}&offset=24"),
            FakeResponse::ok(jsonld_listing(3000, 2)),
        )
        .on_click("pickup today", ClickEffect::GoTo(filtered.clone()));
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(
        page.navigations(),
        vec![PAINT_URL.to_string(), format!("{filtered}&offset=24")]
    );
    assert_eq!(report.records_emitted, 26);
    assert!(sink.records().iter().all(|r| r.pickup_filter_applied));
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn block_abandons_category_but_keeps_earlier_records() {
    let page = FakePage::new()
        .route(PAINT_URL, FakeResponse::ok(jsonld_listing(1000, 24)))
        .route(&offset_url(24), FakeResponse::with_status(403, BLOCK_PAGE))
        .on_click("pickup today", ClickEffect::Check);
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.outcome, CategoryOutcome::Blocked);
    assert!(report.is_blocked());
    assert_eq!(report.pages_visited, 2);
    assert_eq!(sink.records().len(), 24);
    assert_eq!(page.reloads(), 0);
}

#[tokio::test]
async fn crashed_renderer_recovers_after_reload() {
    let page = FakePage::new()
        .route_seq(
            PAINT_URL,
            vec![
                FakeResponse::ok(CRASH_PAGE),
                FakeResponse::ok(jsonld_listing(1000, 4)),
            ],
        )
        .on_click("pickup today", ClickEffect::Check);
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(page.reloads(), 1);
    assert_eq!(report.outcome, CategoryOutcome::Completed);
    assert_eq!(sink.records().len(), 4);
}

#[tokio::test]
async fn persistent_crash_reloads_a_bounded_number_of_times() {
    let page = FakePage::new().route(PAINT_URL, FakeResponse::ok(CRASH_PAGE));
    let config = settings();
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &config, &mut sink, None)
        .await
        .unwrap();

    assert_eq!(page.reloads(), config.crash_retries);
    assert_eq!(report.outcome, CategoryOutcome::ExhaustedRetries);
    assert_eq!(report.stop_reason, StopReason::FetchFailed);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn block_served_by_the_filter_click_abandons_category() {
    let filtered = format!("{PAINT_URL}?availability=pickup");
    let page = FakePage::new()
        .route(PAINT_URL, FakeResponse::ok(jsonld_listing(1000, 24)))
        .route(&filtered, FakeResponse::with_status(403, BLOCK_PAGE))
        .on_click("pickup today", ClickEffect::GoTo(filtered.clone()));
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.outcome, CategoryOutcome::Blocked);
    assert_eq!(report.stop_reason, StopReason::Blocked);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.records_emitted, 0);
    assert!(sink.records().is_empty());
    assert_eq!(page.reloads(), 0);
}

#[tokio::test]
async fn crash_after_the_filter_click_is_reloaded() {
    let filtered = format!("{PAINT_URL}?availability=pickup");
    let page = FakePage::new()
        .route(PAINT_URL, FakeResponse::ok(jsonld_listing(1000, 24)))
        .route_seq(
            &filtered,
            vec![
                FakeResponse::ok(CRASH_PAGE),
                FakeResponse::ok(jsonld_listing(1000, 4)),
            ],
        )
        .on_click("pickup today", ClickEffect::GoTo(filtered.clone()));
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(page.reloads(), 1);
    assert_eq!(report.outcome, CategoryOutcome::Completed);
    assert_eq!(sink.records().len(), 4);
    assert!(sink.records().iter().all(|r| r.pickup_filter_applied));
}

#[tokio::test]
async fn persistent_crash_after_the_filter_click_is_a_fetch_failure() {
    let filtered = format!("{PAINT_URL}?availability=pickup");
    let page = FakePage::new()
        .route(PAINT_URL, FakeResponse::ok(jsonld_listing(1000, 24)))
        .route(&filtered, FakeResponse::ok(CRASH_PAGE))
        .on_click("pickup today", ClickEffect::GoTo(filtered.clone()));
    let config = settings();
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &config, &mut sink, None)
        .await
        .unwrap();

    assert_eq!(page.reloads(), config.crash_retries);
    assert_eq!(report.stop_reason, StopReason::FetchFailed);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn navigation_timeouts_are_retried_then_abandoned() {
    let page = FakePage::new().route(PAINT_URL, FakeResponse::timeout());
    let config = settings();
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &config, &mut sink, None)
        .await
        .unwrap();

    assert_eq!(page.navigations().len(), config.navigation.max_attempts as usize);
    assert_eq!(report.outcome, CategoryOutcome::ExhaustedRetries);
}

#[tokio::test]
async fn server_error_without_block_content_is_a_fetch_failure() {
    let page = FakePage::new().route(
        PAINT_URL,
        FakeResponse::with_status(503, jsonld_listing(1000, 24)),
    );
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.outcome, CategoryOutcome::ExhaustedRetries);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn abort_before_start_visits_nothing() {
    let page = FakePage::new().route(PAINT_URL, FakeResponse::ok(jsonld_listing(1000, 24)));
    let (_tx, rx) = watch::channel(true);
    let mut sink = MemorySink::new();

    let report = scrape_category(&page, &store(), &paint(), &settings(), &mut sink, Some(&rx))
        .await
        .unwrap();

    assert_eq!(report.outcome, CategoryOutcome::Aborted);
    assert_eq!(report.pages_visited, 0);
    assert!(page.navigations().is_empty());
}
