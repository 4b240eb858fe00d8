//! The browser capability the scraping core consumes.
//!
//! Everything above this trait (detector, pickup filter, store context,
//! pagination loop) is written against `PageHandle` only. The concrete
//! anti-detection setup happens before a handle is created; see
//! [`crate::browser`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PageError;

/// What a completed navigation reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationResponse {
    /// HTTP status of the main document, when the browser exposes it.
    pub http_status: Option<u16>,
}

impl NavigationResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.http_status.is_none_or(|s| (200..300).contains(&s))
    }
}

/// A single browser tab with exactly one navigation in flight at a time.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Opaque handle to a matched DOM element.
    type Element: Send + Sync;

    /// Navigate and wait for the load to finish. Implementations bound the
    /// wait with their navigation timeout and report it as
    /// [`PageError::Timeout`].
    async fn navigate(&self, url: &str) -> Result<NavigationResponse, PageError>;

    /// Reload the current document in place.
    async fn reload(&self) -> Result<NavigationResponse, PageError>;

    /// Wait until network activity settles or `timeout` elapses. Never fails;
    /// a timeout just means the page is still busy.
    async fn wait_for_network_idle(&self, timeout: Duration);

    /// Wait for `css` to match at least one element. Returns `false` on timeout.
    async fn wait_for_selector(&self, css: &str, timeout: Duration) -> bool;

    async fn query_all(&self, css: &str) -> Result<Vec<Self::Element>, PageError>;

    /// Elements matching `css` inside `scope`.
    async fn query_within(
        &self,
        scope: &Self::Element,
        css: &str,
    ) -> Result<Vec<Self::Element>, PageError>;

    /// Visible text of the element.
    async fn element_text(&self, element: &Self::Element) -> Result<String, PageError>;

    async fn element_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, PageError>;

    /// Live checked state: the element's own `checked` property or a checked
    /// input inside it.
    async fn is_checked(&self, element: &Self::Element) -> Result<bool, PageError>;

    async fn click(&self, element: &Self::Element) -> Result<(), PageError>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<(), PageError>;

    async fn press_enter(&self, element: &Self::Element) -> Result<(), PageError>;

    /// Full serialized HTML of the current document.
    async fn content(&self) -> Result<String, PageError>;

    async fn title(&self) -> Result<String, PageError>;

    async fn current_url(&self) -> Result<String, PageError>;
}
