//! Scripted in-memory `PageHandle` for driving the scraper against fixture
//! HTML. Elements are addressed by selector and index and re-resolved
//! against the current document on every access.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lowes_core::{CategoryTarget, StoreTarget};
use lowes_scraper::{NavigationResponse, PageError, PageHandle, ScrapeSettings};
use scraper::{ElementRef, Html, Selector};

pub const PAINT_URL: &str = "https://www.lowes.com/pl/paint/4294644135";

#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub html: String,
    pub status: Option<u16>,
    pub timeout: bool,
}

impl FakeResponse {
    pub fn ok(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            status: Some(200),
            timeout: false,
        }
    }

    pub fn with_status(status: u16, html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            status: Some(status),
            timeout: false,
        }
    }

    pub fn timeout() -> Self {
        Self {
            html: String::new(),
            status: None,
            timeout: true,
        }
    }

    fn empty() -> Self {
        Self::ok("<html><head><title>Lowe's</title></head><body></body></html>")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FakeElement {
    pub css: String,
    pub index: usize,
    pub scope: Option<(String, usize)>,
}

#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// The clicked element reports itself checked until the next load.
    Check,
    /// The click loads another route, as a refinement link would.
    GoTo(String),
    Nothing,
}

#[derive(Default)]
struct State {
    url: String,
    html: String,
    checked: HashSet<FakeElement>,
    routes: HashMap<String, VecDeque<FakeResponse>>,
    navigations: Vec<String>,
    reloads: u32,
    clicked: Vec<(FakeElement, String)>,
    typed: Vec<String>,
}

#[derive(Default)]
pub struct FakePage {
    state: Mutex<State>,
    click_rules: Vec<(String, ClickEffect)>,
    enter_target: Option<String>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `response` for `url` on every visit.
    pub fn route(self, url: &str, response: FakeResponse) -> Self {
        self.route_seq(url, vec![response])
    }

    /// Serves `responses` in order for `url`; the last one repeats.
    pub fn route_seq(self, url: &str, responses: Vec<FakeResponse>) -> Self {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_string(), responses.into());
        self
    }

    /// Clicking an element whose text contains `text` (case-insensitive)
    /// triggers `effect`.
    pub fn on_click(mut self, text: &str, effect: ClickEffect) -> Self {
        self.click_rules.push((text.to_lowercase(), effect));
        self
    }

    /// Pressing Enter in any input loads `url`.
    pub fn on_enter(mut self, url: &str) -> Self {
        self.enter_target = Some(url.to_string());
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn reloads(&self) -> u32 {
        self.state.lock().unwrap().reloads
    }

    /// Clicked elements with their text at click time.
    pub fn clicked(&self) -> Vec<(FakeElement, String)> {
        self.state.lock().unwrap().clicked.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state.lock().unwrap().typed.clone()
    }

    fn take_response(state: &mut State, url: &str) -> FakeResponse {
        match state.routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(FakeResponse::empty),
            None => FakeResponse::empty(),
        }
    }

    fn load(state: &mut State, url: &str) -> Result<NavigationResponse, PageError> {
        let response = Self::take_response(state, url);
        if response.timeout {
            return Err(PageError::Timeout {
                operation: "navigate",
                timeout_secs: 60,
            });
        }
        state.url = url.to_string();
        state.html = response.html;
        state.checked.clear();
        Ok(NavigationResponse {
            http_status: response.status,
        })
    }

    fn with_element<R>(html: &str, el: &FakeElement, f: impl FnOnce(ElementRef<'_>) -> R) -> Option<R> {
        let doc = Html::parse_document(html);
        let selector = Selector::parse(&el.css).ok()?;
        let found = match &el.scope {
            Some((scope_css, scope_index)) => {
                let scope_sel = Selector::parse(scope_css).ok()?;
                let scope = doc.select(&scope_sel).nth(*scope_index)?;
                scope.select(&selector).nth(el.index)
            }
            None => doc.select(&selector).nth(el.index),
        }?;
        Some(f(found))
    }

    fn text_of(html: &str, el: &FakeElement) -> Option<String> {
        Self::with_element(html, el, |e| e.text().collect::<String>())
    }

    fn stale(el: &FakeElement) -> PageError {
        PageError::Script(format!("stale element {}[{}]", el.css, el.index))
    }
}

#[async_trait]
impl PageHandle for FakePage {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<NavigationResponse, PageError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        Self::load(&mut state, url)
    }

    async fn reload(&self) -> Result<NavigationResponse, PageError> {
        let mut state = self.state.lock().unwrap();
        state.reloads += 1;
        let url = state.url.clone();
        Self::load(&mut state, &url)
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) {}

    async fn wait_for_selector(&self, css: &str, _timeout: Duration) -> bool {
        self.query_all(css).await.is_ok_and(|found| !found.is_empty())
    }

    async fn query_all(&self, css: &str) -> Result<Vec<FakeElement>, PageError> {
        let html = self.state.lock().unwrap().html.clone();
        let selector =
            Selector::parse(css).map_err(|e| PageError::Script(format!("bad selector {css}: {e:?}")))?;
        let count = Html::parse_document(&html).select(&selector).count();
        Ok((0..count)
            .map(|index| FakeElement {
                css: css.to_string(),
                index,
                scope: None,
            })
            .collect())
    }

    async fn query_within(&self, scope: &FakeElement, css: &str) -> Result<Vec<FakeElement>, PageError> {
        let html = self.state.lock().unwrap().html.clone();
        let selector =
            Selector::parse(css).map_err(|e| PageError::Script(format!("bad selector {css}: {e:?}")))?;
        let count = Self::with_element(&html, scope, |e| e.select(&selector).count())
            .ok_or_else(|| Self::stale(scope))?;
        Ok((0..count)
            .map(|index| FakeElement {
                css: css.to_string(),
                index,
                scope: Some((scope.css.clone(), scope.index)),
            })
            .collect())
    }

    async fn element_text(&self, element: &FakeElement) -> Result<String, PageError> {
        let html = self.state.lock().unwrap().html.clone();
        Self::text_of(&html, element).ok_or_else(|| Self::stale(element))
    }

    async fn element_attribute(
        &self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        let state = self.state.lock().unwrap();
        if name == "aria-checked" && state.checked.contains(element) {
            return Ok(Some("true".to_string()));
        }
        Self::with_element(&state.html, element, |e| e.value().attr(name).map(str::to_string))
            .ok_or_else(|| Self::stale(element))
    }

    async fn is_checked(&self, element: &FakeElement) -> Result<bool, PageError> {
        let state = self.state.lock().unwrap();
        if state.checked.contains(element) {
            return Ok(true);
        }
        Ok(Self::with_element(&state.html, element, |e| e.value().attr("checked").is_some())
            .unwrap_or(false))
    }

    async fn click(&self, element: &FakeElement) -> Result<(), PageError> {
        let mut state = self.state.lock().unwrap();
        let text = Self::text_of(&state.html, element).ok_or_else(|| Self::stale(element))?;
        state.clicked.push((element.clone(), text.clone()));

        let lower = text.to_lowercase();
        let effect = self
            .click_rules
            .iter()
            .find(|(needle, _)| lower.contains(needle.as_str()))
            .map_or(ClickEffect::Nothing, |(_, effect)| effect.clone());
        match effect {
            ClickEffect::Check => {
                state.checked.insert(element.clone());
            }
            ClickEffect::GoTo(url) => {
                Self::load(&mut state, &url)?;
            }
            ClickEffect::Nothing => {}
        }
        Ok(())
    }

    async fn type_text(&self, _element: &FakeElement, text: &str) -> Result<(), PageError> {
        self.state.lock().unwrap().typed.push(text.to_string());
        Ok(())
    }

    async fn press_enter(&self, _element: &FakeElement) -> Result<(), PageError> {
        let mut state = self.state.lock().unwrap();
        if let Some(url) = &self.enter_target {
            Self::load(&mut state, url)?;
        }
        Ok(())
    }

    async fn content(&self) -> Result<String, PageError> {
        Ok(self.state.lock().unwrap().html.clone())
    }

    async fn title(&self) -> Result<String, PageError> {
        let html = self.state.lock().unwrap().html.clone();
        let doc = Html::parse_document(&html);
        let selector = Selector::parse("title").unwrap();
        Ok(doc
            .select(&selector)
            .next()
            .map(|t| t.text().collect::<String>())
            .unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.state.lock().unwrap().url.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const PICKUP_LABEL: &str =
    r#"<label for="pickup-today"><input type="checkbox" id="pickup-today"> Pickup Today</label>"#;

pub const BLOCK_PAGE: &str = r#"<html><head><title>Access Denied</title></head><body>
    <h1>Access Denied</h1>You don't have permission to access this page on this server.
    <p>Reference&#32;&#35;18&#46;abc123 https&#58;&#47;&#47;errors&#46;edgesuite&#46;net</p>
    </body></html>"#;

pub const CRASH_PAGE: &str = r#"<html><head><title>Aw, Snap!</title></head><body>
    <p>Something went wrong while displaying this webpage. Error code: Out of Memory</p>
    </body></html>"#;

/// A listing page carrying `count` products as one JSON-LD `ItemList`,
/// SKUs starting at `first_sku`, plus the pickup filter control.
pub fn jsonld_listing(first_sku: u64, count: u64) -> String {
    let mut items = Vec::new();
    for i in 0..count {
        let sku = first_sku + i;
        items.push(format!(
            r#"{{"@type":"ListItem","position":{pos},"item":{{"@type":"Product","name":"Paint {sku}","sku":"{sku}","url":"https://www.lowes.com/pd/Paint-{sku}/{sku}","offers":{{"@type":"Offer","price":"{price}.98","availability":"https://schema.org/InStock"}}}}}}"#,
            pos = i + 1,
            price = 20 + i,
        ));
    }
    format!(
        r#"<html><head><title>Paint at Lowes.com</title>
        <script type="application/ld+json">{{"@context":"https://schema.org","@type":"ItemList","itemListElement":[{}]}}</script>
        </head><body><aside>{PICKUP_LABEL}</aside></body></html>"#,
        items.join(",")
    )
}

/// A listing page of rendered cards; `pickup[i]` decides whether card `i`
/// states pickup availability.
pub fn card_listing(first_sku: u64, pickup: &[bool]) -> String {
    let mut body = String::new();
    for (i, has_pickup) in pickup.iter().enumerate() {
        let sku = first_sku + i as u64;
        let availability = if *has_pickup {
            "Pickup Today: 12 in stock"
        } else {
            "Delivery as soon as Thu"
        };
        let _ = write!(
            body,
            r#"<div data-testid="product-pod">
                 <a href="/pd/Tool-{sku}/{sku}">Tool {sku}</a>
                 <span data-testid="current-price">$49.98</span>
                 <div data-testid="fulfillment-availability">{availability}</div>
               </div>"#
        );
    }
    format!("<html><head><title>Power Tools</title></head><body>{body}</body></html>")
}

pub fn store() -> StoreTarget {
    StoreTarget {
        store_id: "1845".to_string(),
        name: "Lowe's of Greenville".to_string(),
        zip: "29607".to_string(),
        url: None,
    }
}

pub fn paint() -> CategoryTarget {
    CategoryTarget {
        name: "Paint".to_string(),
        url: PAINT_URL.to_string(),
    }
}

pub fn settings() -> ScrapeSettings {
    ScrapeSettings::default().without_delays()
}
