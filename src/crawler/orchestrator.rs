//! Crawl orchestration
//!
//! Drives one run end to end: session acquisition, seed page enumeration,
//! per-URL extraction with escalation to a fresh context, and submission of
//! the resulting batch.
//!
//! # Per-URL states
//!
//! ```text
//! Pending ──▶ AttemptingShared ──┬──▶ Accepted
//!                                ├──▶ Rejected
//!                                └──▶ EscalatingFresh ──┬──▶ Accepted
//!                                                       └──▶ Rejected
//! ```
//!
//! Escalation happens only on context loss. A lost shared context is closed
//! and replaced before the next URL is attempted.

use chrono::Utc;
use scraper::Html;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

use crate::browser::{Connector, NavigationContext, ResourceFilter, Session, SessionManager};
use crate::config::{Config, CrawlConfig};
use crate::crawler::extractor::PageExtractor;
use crate::error::Result;
use crate::models::{CrawlBatch, CrawlReport, CrawlStats, ListingRecord};
use crate::parser::extract_target_links;
use crate::sink::{ApiSink, ResultSink};
use crate::utils::error::CrawlError;

/// Lifecycle of a single target URL within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    Pending,
    AttemptingShared,
    EscalatingFresh,
    Accepted,
    Rejected,
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::AttemptingShared => "attempting_shared",
            Self::EscalatingFresh => "escalating_fresh",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

fn transition(url: &str, from: UrlState, to: UrlState) -> UrlState {
    debug!(url, from = %from, to = %to, "URL state transition");
    to
}

async fn close_context(ctx: Box<dyn NavigationContext>, role: &str) {
    match ctx.close().await {
        Ok(()) => debug!(role, "Navigation context closed"),
        Err(e) => warn!(role, error = %e, "Failed to close navigation context"),
    }
}

/// Runs crawls against the configured seed page
pub struct CrawlOrchestrator {
    sessions: SessionManager,
    extractor: PageExtractor,
    filter: ResourceFilter,
    sink: Arc<dyn ResultSink>,
    seed_url: String,
    navigation_timeout: Duration,
    step_delay: Duration,
    max_targets: Option<usize>,
}

impl fmt::Debug for CrawlOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOrchestrator")
            .field("sessions", &self.sessions)
            .field("filter", &self.filter)
            .field("seed_url", &self.seed_url)
            .field("max_targets", &self.max_targets)
            .finish()
    }
}

impl CrawlOrchestrator {
    pub fn new(
        sessions: SessionManager,
        extractor: PageExtractor,
        sink: Arc<dyn ResultSink>,
        crawl: &CrawlConfig,
    ) -> Self {
        Self {
            sessions,
            extractor,
            filter: ResourceFilter::default(),
            sink,
            seed_url: crawl.seed_url.clone(),
            navigation_timeout: crawl.navigation_timeout(),
            step_delay: crawl.step_delay(),
            max_targets: crawl.max_targets,
        }
    }

    /// Build the full production wiring from configuration
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration before anything is constructed.
    pub fn from_config(connector: Arc<dyn Connector>, config: &Config) -> Result<Self> {
        config.validate()?;
        let sessions = SessionManager::from_config(connector, config)?;
        let extractor = PageExtractor::from_config(&config.crawl)?;
        let sink = ApiSink::from_config(&config.api, config.mode)?;

        Ok(Self::new(sessions, extractor, Arc::new(sink), &config.crawl))
    }

    /// Replace the resource filter installed on every context
    pub fn with_filter(mut self, filter: ResourceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    /// Crawl once and submit a non-empty batch
    ///
    /// Returns the ingestion API response, or `None` when nothing was
    /// submitted or the submission failed.
    ///
    /// # Errors
    ///
    /// Only session acquisition and seed page failures abort a run.
    pub async fn run(&self) -> std::result::Result<Option<Value>, CrawlError> {
        let report = self.crawl().await?;

        if report.batch.is_empty() {
            info!("No listings extracted, skipping submission");
            return Ok(None);
        }

        Ok(self.sink.submit(report.batch.records()).await)
    }

    /// Crawl every listing reachable from the seed page
    ///
    /// The session is closed whether or not the crawl succeeds.
    pub async fn crawl(&self) -> std::result::Result<CrawlReport, CrawlError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("crawl", %run_id);

        self.crawl_inner(run_id).instrument(span).await
    }

    async fn crawl_inner(&self, run_id: Uuid) -> std::result::Result<CrawlReport, CrawlError> {
        let started_at = Utc::now();
        let started = Instant::now();
        info!(seed = %self.seed_url, "Starting crawl");

        let session = self.sessions.acquire().await?;
        let result = self.crawl_session(session.as_ref()).await;

        match session.close().await {
            Ok(()) => debug!("Browser session closed"),
            Err(e) => warn!(error = %e, "Failed to close browser session"),
        }

        let (batch, mut stats) = result?;
        stats.elapsed = started.elapsed();

        info!(
            targets = stats.targets_found,
            accepted = stats.accepted,
            rejected = stats.rejected,
            escalations = stats.escalations,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "All {} pages processed",
            stats.targets_found
        );

        Ok(CrawlReport {
            run_id,
            started_at,
            batch,
            stats,
        })
    }

    async fn crawl_session(
        &self,
        session: &dyn Session,
    ) -> std::result::Result<(CrawlBatch, CrawlStats), CrawlError> {
        let shared = session
            .open_context(&self.filter)
            .await
            .map_err(CrawlError::Context)?;

        let targets = match self.read_targets(shared.as_ref()).await {
            Ok(targets) => targets,
            Err(e) => {
                close_context(shared, "shared").await;
                return Err(e);
            }
        };

        let mut stats = CrawlStats {
            targets_found: targets.len(),
            ..CrawlStats::default()
        };
        let mut batch = CrawlBatch::new();
        let mut shared = Some(shared);

        for (index, url) in targets.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.step_delay).await;
            }

            info!(url, position = index + 1, total = targets.len(), "Processing listing");
            if let Some(record) = self.process(session, &mut shared, url, &mut stats).await {
                batch.push(record);
            }
        }

        if let Some(ctx) = shared {
            close_context(ctx, "shared").await;
        }

        Ok((batch, stats))
    }

    /// Load the seed page and enumerate target URLs in document order
    async fn read_targets(
        &self,
        ctx: &dyn NavigationContext,
    ) -> std::result::Result<Vec<String>, CrawlError> {
        let seed_error = |source| CrawlError::SeedNavigation {
            url: self.seed_url.clone(),
            source,
        };

        ctx.navigate(&self.seed_url, self.navigation_timeout)
            .await
            .map_err(seed_error)?;
        let html = ctx.content().await.map_err(seed_error)?;

        let base = ctx
            .current_url()
            .await
            .and_then(|u| Url::parse(&u).ok())
            .or_else(|| Url::parse(&self.seed_url).ok());

        let mut targets = {
            let document = Html::parse_document(&html);
            extract_target_links(&document, base.as_ref())
        };
        info!(count = targets.len(), "Target URLs found on seed page");

        if let Some(limit) = self.max_targets {
            if targets.len() > limit {
                info!(limit, "Truncating target URLs");
                targets.truncate(limit);
            }
        }

        Ok(targets)
    }

    /// Resolve one URL to `Accepted` or `Rejected`
    async fn process(
        &self,
        session: &dyn Session,
        shared: &mut Option<Box<dyn NavigationContext>>,
        url: &str,
        stats: &mut CrawlStats,
    ) -> Option<ListingRecord> {
        let state = UrlState::Pending;

        if shared.is_none() {
            match session.open_context(&self.filter).await {
                Ok(ctx) => {
                    info!("Opened replacement shared context");
                    *shared = Some(ctx);
                }
                Err(e) => {
                    warn!(url, error = %e, "Could not replace shared context");
                    transition(url, state, UrlState::Rejected);
                    stats.rejected += 1;
                    return None;
                }
            }
        }
        let ctx = shared.as_deref()?;

        let state = transition(url, state, UrlState::AttemptingShared);
        let state = match self.extractor.extract(ctx, url).await {
            Ok(record) => {
                transition(url, state, UrlState::Accepted);
                stats.accepted += 1;
                return Some(record);
            }
            Err(e) if e.is_context_loss() => {
                warn!(url, error = %e, "Shared context lost, escalating to a fresh context");
                if let Some(lost) = shared.take() {
                    close_context(lost, "lost shared").await;
                }
                stats.escalations += 1;
                transition(url, state, UrlState::EscalatingFresh)
            }
            Err(e) => {
                warn!(url, error = %e, "Listing rejected");
                transition(url, state, UrlState::Rejected);
                stats.rejected += 1;
                return None;
            }
        };

        let fresh = match session.open_context(&self.filter).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(url, error = %e, "Could not open fresh context");
                transition(url, state, UrlState::Rejected);
                stats.rejected += 1;
                return None;
            }
        };

        let result = self.extractor.extract(fresh.as_ref(), url).await;
        close_context(fresh, "fresh").await;

        match result {
            Ok(record) => {
                transition(url, state, UrlState::Accepted);
                stats.accepted += 1;
                Some(record)
            }
            Err(e) => {
                warn!(url, error = %e, "Listing rejected after escalation");
                transition(url, state, UrlState::Rejected);
                stats.rejected += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::ChromiumConnector;
    use crate::config::{ConfigError, RunMode};
    use crate::error::Error;

    #[test]
    fn test_url_state_display() {
        assert_eq!(UrlState::AttemptingShared.to_string(), "attempting_shared");
        assert_eq!(UrlState::EscalatingFresh.to_string(), "escalating_fresh");
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = Config {
            mode: RunMode::Development,
            ..Config::default()
        };
        let result = CrawlOrchestrator::from_config(Arc::new(ChromiumConnector), &config);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Missing(ref key))) if key == "WS_ENDPOINT"
        ));

        let config = Config::default();
        let orchestrator = CrawlOrchestrator::from_config(Arc::new(ChromiumConnector), &config)
            .unwrap();
        assert_eq!(orchestrator.seed_url(), config.crawl.seed_url);
    }

    #[test]
    fn test_transition_returns_target() {
        assert_eq!(
            transition("u", UrlState::Pending, UrlState::AttemptingShared),
            UrlState::AttemptingShared
        );
    }
}
