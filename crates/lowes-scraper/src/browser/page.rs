use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::Page;

use super::stealth::{network_idle_script, IS_CHECKED_FN, RESPONSE_STATUS_SCRIPT};
use crate::error::PageError;
use crate::page::{NavigationResponse, PageHandle};

const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// [`PageHandle`] over a chromiumoxide tab.
#[derive(Debug, Clone)]
pub struct ChromePage {
    page: Page,
    nav_timeout: Duration,
}

impl ChromePage {
    pub(crate) fn new(page: Page, nav_timeout: Duration) -> Self {
        Self { page, nav_timeout }
    }

    fn timeout_error(&self, operation: &'static str) -> PageError {
        PageError::Timeout {
            operation,
            timeout_secs: self.nav_timeout.as_secs(),
        }
    }

    async fn response_status(&self) -> Option<u16> {
        let result = self.page.evaluate(RESPONSE_STATUS_SCRIPT).await.ok()?;
        result.into_value::<Option<u16>>().ok().flatten()
    }
}

#[async_trait]
impl PageHandle for ChromePage {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<NavigationResponse, PageError> {
        match tokio::time::timeout(self.nav_timeout, self.page.goto(url)).await {
            Err(_) => return Err(self.timeout_error("navigate")),
            Ok(Err(e)) => {
                return Err(PageError::Navigation {
                    url: url.to_owned(),
                    reason: e.to_string(),
                })
            }
            Ok(Ok(_)) => {}
        }
        Ok(NavigationResponse {
            http_status: self.response_status().await,
        })
    }

    async fn reload(&self) -> Result<NavigationResponse, PageError> {
        match tokio::time::timeout(self.nav_timeout, self.page.reload()).await {
            Err(_) => return Err(self.timeout_error("reload")),
            Ok(Err(e)) => {
                return Err(PageError::Navigation {
                    url: self.current_url().await.unwrap_or_default(),
                    reason: e.to_string(),
                })
            }
            Ok(Ok(_)) => {}
        }
        Ok(NavigationResponse {
            http_status: self.response_status().await,
        })
    }

    async fn wait_for_network_idle(&self, timeout: Duration) {
        if timeout.is_zero() {
            return;
        }
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let script = network_idle_script(timeout_ms);
        let grace = timeout + Duration::from_secs(1);
        match tokio::time::timeout(grace, self.page.evaluate(script)).await {
            Ok(Ok(result)) => {
                let idle = result.into_value::<bool>().unwrap_or(false);
                tracing::trace!(idle, "network idle wait finished");
            }
            Ok(Err(e)) => tracing::debug!(error = %e, "network idle check failed"),
            Err(_) => tracing::debug!("network idle check timed out"),
        }
    }

    async fn wait_for_selector(&self, css: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(found) = self.page.find_elements(css).await {
                if !found.is_empty() {
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn query_all(&self, css: &str) -> Result<Vec<Element>, PageError> {
        Ok(self.page.find_elements(css).await?)
    }

    async fn query_within(&self, scope: &Element, css: &str) -> Result<Vec<Element>, PageError> {
        Ok(scope.find_elements(css).await?)
    }

    async fn element_text(&self, element: &Element) -> Result<String, PageError> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn element_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, PageError> {
        Ok(element.attribute(name).await?)
    }

    async fn is_checked(&self, element: &Element) -> Result<bool, PageError> {
        let returned = element.call_js_fn(IS_CHECKED_FN, false).await?;
        Ok(returned
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn click(&self, element: &Element) -> Result<(), PageError> {
        element.click().await?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<(), PageError> {
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self, element: &Element) -> Result<(), PageError> {
        element.press_key("Enter").await?;
        Ok(())
    }

    async fn content(&self) -> Result<String, PageError> {
        Ok(self.page.content().await?)
    }

    async fn title(&self) -> Result<String, PageError> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }
}
