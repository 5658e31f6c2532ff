pub mod error;

pub use error::{RebrowserError, Result};

use std::time::Duration;

use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Client for a remote anti-detection browser endpoint. Each `session()`
/// call opens one fresh CDP connection; the caller owns the session and
/// must close it on every exit path.
pub struct RebrowserClient {
    ws_url: String,
}

impl RebrowserClient {
    pub fn new(ws_url: &str) -> Self {
        Self {
            ws_url: ws_url.to_string(),
        }
    }

    /// Connect and return a session wrapping the vendor-provided page
    /// (or a fresh one when the endpoint opens without any).
    pub async fn session(&self) -> Result<BrowserSession> {
        let (browser, mut handler) =
            tokio::time::timeout(CONNECT_TIMEOUT, Browser::connect(self.ws_url.clone()))
                .await
                .map_err(|_| {
                    RebrowserError::Connect(format!(
                        "timed out after {}s",
                        CONNECT_TIMEOUT.as_secs()
                    ))
                })?
                .map_err(|e| RebrowserError::Connect(e.to_string()))?;

        // Drive CDP events until the connection drops.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => browser.new_page("about:blank").await?,
        };

        debug!(ws_url = self.ws_url.as_str(), "Browser session opened");
        Ok(BrowserSession {
            browser,
            handler_task,
            page,
        })
    }
}

/// One live remote browser session. All interaction goes through the single
/// page the session owns.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

impl BrowserSession {
    /// Navigate and wait for the load to settle.
    pub async fn goto(&self, url: &str) -> Result<()> {
        info!(url, "Navigating");
        tokio::time::timeout(NAVIGATION_TIMEOUT, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .map_err(|_| {
            RebrowserError::Navigation(format!(
                "timed out loading {url} after {}s",
                NAVIGATION_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| RebrowserError::Navigation(e.to_string()))?;

        Ok(())
    }

    /// Poll for an element until it appears or the timeout lapses.
    /// CDP has no server-side wait, so this is the client-side equivalent
    /// of a selector wait.
    pub async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<chromiumoxide::Element> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RebrowserError::ElementNotFound {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    /// Wait for an element, then click it.
    pub async fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
        let element = self.wait_for_element(selector, timeout).await?;
        element.click().await?;
        Ok(())
    }

    /// Wait for an element, then type into it.
    pub async fn type_into(&self, selector: &str, text: &str, timeout: Duration) -> Result<()> {
        let element = self.wait_for_element(selector, timeout).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    /// Evaluate a JS expression in the page and deserialize its result.
    pub async fn evaluate<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let value = self
            .page
            .evaluate(expression)
            .await?
            .into_value::<T>()
            .map_err(|e| RebrowserError::Protocol(format!("evaluation result: {e}")))?;
        Ok(value)
    }

    /// Fixed settle delay for animations/late hydration the page gives no
    /// signal for.
    pub async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Close the session. Must run on every exit path; an abandoned
    /// remote session keeps billing until the vendor reaps it.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        self.handler_task.abort();
        debug!("Browser session closed");
    }
}
