//! Remote Chromium sessions using chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::fmt::Display;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::filter::{FilterDecision, ResourceFilter, ResourceKind};
use super::{Connector, NavigationContext, Session};
use crate::utils::error::BrowserError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn cdp_error(e: impl Display) -> BrowserError {
    BrowserError::from_protocol(e.to_string())
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}

/// Connects to a browser exposing the DevTools protocol over a websocket,
/// such as a browserless container.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumConnector;

#[async_trait]
impl Connector for ChromiumConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Session>, BrowserError> {
        let (browser, mut handler) = Browser::connect(endpoint)
            .await
            .map_err(|e| BrowserError::Connect(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler reported an error");
                }
            }
            debug!("Browser handler loop finished");
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
        }))
    }
}

/// A connected remote browser.
pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl Session for ChromiumSession {
    async fn open_context(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Box<dyn NavigationContext>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(cdp_error)?;

        // Subscribe before enabling interception so no paused request is missed
        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(cdp_error)?;

        let intercept_page = page.clone();
        let filter = filter.clone();
        let interceptor = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let kind = resource_kind(&event.resource_type);
                let outcome = match filter.classify(Some(kind)) {
                    FilterDecision::Block => intercept_page
                        .execute(FailRequestParams::new(
                            event.request_id.clone(),
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ()),
                    FilterDecision::Allow => intercept_page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ()),
                };
                if let Err(e) = outcome {
                    trace!(error = %e, ?kind, "Could not resolve paused request");
                }
            }
        });

        let enable = fetch::EnableParams::builder()
            .pattern(fetch::RequestPattern::builder().url_pattern("*").build())
            .build();
        if let Err(e) = page.execute(enable).await {
            interceptor.abort();
            let _ = page.close().await;
            return Err(cdp_error(e));
        }

        Ok(Box::new(ChromiumContext { page, interceptor }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let ChromiumSession {
            mut browser,
            handler_task,
        } = *self;

        let result = browser.close().await.map(|_| ()).map_err(cdp_error);
        handler_task.abort();
        result
    }
}

/// A single page with request interception enabled.
pub struct ChromiumContext {
    page: Page,
    interceptor: JoinHandle<()>,
}

impl ChromiumContext {
    /// Poll a readiness check until it passes or `timeout` expires. Errors
    /// while polling are expected during document swaps and only surface
    /// when they carry a context-loss signature at the deadline.
    async fn poll_until<F, Fut>(
        &self,
        what: &str,
        timeout: Duration,
        mut check: F,
    ) -> Result<(), BrowserError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<bool, BrowserError>>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut last_error = None;

        loop {
            match check().await {
                Ok(true) => return Ok(()),
                Ok(false) => last_error = None,
                Err(e) => last_error = Some(e),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(match last_error {
                    Some(e) if e.is_context_loss() => e,
                    _ => BrowserError::Timeout {
                        what: what.to_string(),
                        after_ms: timeout.as_millis() as u64,
                    },
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl NavigationContext for ChromiumContext {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let started = tokio::time::Instant::now();

        let response = tokio::time::timeout(timeout, self.page.execute(NavigateParams::new(url)))
            .await
            .map_err(|_| BrowserError::Timeout {
                what: format!("navigation to {url}"),
                after_ms: timeout.as_millis() as u64,
            })?
            .map_err(cdp_error)?;

        if let Some(reason) = response.result.error_text.clone() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason,
            });
        }

        let page = self.page.clone();
        let remaining = timeout.saturating_sub(started.elapsed());
        self.poll_until("document readiness", remaining, || {
            let page = page.clone();
            async move {
                let state: String = page
                    .evaluate("document.readyState")
                    .await
                    .map_err(cdp_error)?
                    .into_value()
                    .map_err(cdp_error)?;
                Ok(state != "loading")
            }
        })
        .await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let page = self.page.clone();
        self.poll_until(selector, timeout, || {
            let page = page.clone();
            let selector = selector.to_string();
            async move { page.find_element(selector).await.map(|_| true).map_err(cdp_error) }
        })
        .await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page.content().await.map_err(cdp_error)
    }

    async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let ChromiumContext { page, interceptor } = *self;
        interceptor.abort();
        page.close().await.map_err(cdp_error)
    }
}
