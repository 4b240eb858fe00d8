//! Store context flows: direct store page and zip search.

mod common;

use common::{settings, store, ClickEffect, FakePage, FakeResponse};
use lowes_scraper::parse::SITE_ORIGIN;
use lowes_scraper::selectors::STORE_CARD_CSS;
use lowes_scraper::set_store_context;

const STORE_PAGE: &str = "https://www.lowes.com/store/SC-Greenville/1845";
const CHOOSER_URL: &str = "https://www.lowes.com/store-chooser";
const RESULTS_URL: &str = "https://www.lowes.com/store-chooser/results";

const HOME: &str = r#"<html><body>
    <header><button data-testid="store-chooser">Find a Store</button></header>
    </body></html>"#;

const CHOOSER: &str = r#"<html><body>
    <form><input name="zipCode" placeholder="ZIP Code"></form>
    </body></html>"#;

const RESULTS: &str = r#"<html><body><ul>
    <li data-testid="store-card" data-store-id="0595">Lowe's of Anderson #0595 12.1 mi
        <button>Set as My Store</button></li>
    <li data-testid="store-card" data-store-id="1845">Lowe's of Greenville #1845 0.4 mi
        <button>Set as My Store</button></li>
    </ul></body></html>"#;

fn zip_search_site() -> FakePage {
    FakePage::new()
        .route(SITE_ORIGIN, FakeResponse::ok(HOME))
        .route(CHOOSER_URL, FakeResponse::ok(CHOOSER))
        .route(RESULTS_URL, FakeResponse::ok(RESULTS))
        .on_click("find a store", ClickEffect::GoTo(CHOOSER_URL.to_string()))
        .on_enter(RESULTS_URL)
}

#[tokio::test]
async fn zip_search_selects_matching_store_card() {
    let page = zip_search_site();

    assert!(set_store_context(&page, &store(), &settings()).await);

    assert_eq!(page.typed(), vec!["29607".to_string()]);
    let (element, text) = page.clicked().last().cloned().unwrap();
    assert_eq!(text, "Set as My Store");
    assert_eq!(element.scope, Some((STORE_CARD_CSS.to_string(), 1)));
}

#[tokio::test]
async fn store_page_is_used_when_known() {
    let page = FakePage::new().route(
        STORE_PAGE,
        FakeResponse::ok("<html><body><button>Set as My Store</button></body></html>"),
    );
    let mut target = store();
    target.url = Some(STORE_PAGE.to_string());

    assert!(set_store_context(&page, &target, &settings()).await);
    assert_eq!(page.navigations(), vec![STORE_PAGE.to_string()]);
}

#[tokio::test]
async fn store_page_without_control_falls_back_to_zip_search() {
    let page = zip_search_site().route(
        STORE_PAGE,
        FakeResponse::ok("<html><body><h1>Lowe's of Greenville</h1></body></html>"),
    );
    let mut target = store();
    target.url = Some(STORE_PAGE.to_string());

    assert!(set_store_context(&page, &target, &settings()).await);
    assert_eq!(
        page.navigations(),
        vec![STORE_PAGE.to_string(), SITE_ORIGIN.to_string()]
    );
}

#[tokio::test]
async fn missing_chooser_reports_failure() {
    let page = FakePage::new();
    let config = settings();

    assert!(!set_store_context(&page, &store(), &config).await);

    let navigations = page.navigations();
    assert_eq!(navigations.len(), config.store_context.max_attempts as usize);
    assert!(navigations.iter().all(|url| url == SITE_ORIGIN));
}
