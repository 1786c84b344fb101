//! Single-listing extraction with local retries
//!
//! One attempt is: navigate, wait for the content container, read the DOM
//! and parse it. Failed attempts are retried on the same context after a
//! fixed delay. Context loss is returned at once, since retrying on a dead
//! context cannot succeed; the orchestrator escalates it instead.

use scraper::Html;
use std::time::Duration;
use tracing::{debug, info};

use crate::browser::NavigationContext;
use crate::config::CrawlConfig;
use crate::models::ListingRecord;
use crate::parser::{parse_listing, ExtractionRules, CONTENT_CONTAINER};
use crate::utils::error::{ExtractError, ParseError};
use crate::utils::retry::{with_retry_if, RetryPolicy};

/// Loads listing pages and parses them into records
#[derive(Debug, Clone)]
pub struct PageExtractor {
    rules: ExtractionRules,
    policy: RetryPolicy,
    navigation_timeout: Duration,
    content_timeout: Duration,
}

impl PageExtractor {
    pub fn new(
        rules: ExtractionRules,
        policy: RetryPolicy,
        navigation_timeout: Duration,
        content_timeout: Duration,
    ) -> Self {
        Self {
            rules,
            policy,
            navigation_timeout,
            content_timeout,
        }
    }

    /// # Errors
    ///
    /// Returns `ParseError::InvalidRule` if the configured views pattern is
    /// not a valid regex
    pub fn from_config(config: &CrawlConfig) -> Result<Self, ParseError> {
        Ok(Self::new(
            ExtractionRules::from_config(config)?,
            config.page_policy(),
            config.navigation_timeout(),
            config.content_timeout(),
        ))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Extract one listing, retrying transient failures on `ctx`
    ///
    /// # Errors
    ///
    /// - the context-loss error itself, as soon as one is seen
    /// - `ExtractError::Exhausted` wrapping the last failure once every
    ///   attempt has failed
    pub async fn extract(
        &self,
        ctx: &dyn NavigationContext,
        url: &str,
    ) -> Result<ListingRecord, ExtractError> {
        let result = with_retry_if(
            &self.policy,
            |attempt| async move {
                debug!(url, attempt, "Extracting listing");
                self.attempt(ctx, url).await
            },
            |e: &ExtractError| !e.is_context_loss(),
        )
        .await;

        match result {
            Ok(record) => {
                info!(url, views = ?record.views, "Listing extracted");
                Ok(record)
            }
            Err(e) if e.is_context_loss() => Err(e),
            Err(last) => Err(ExtractError::Exhausted {
                url: url.to_string(),
                attempts: self.policy.attempts(),
                last: Box::new(last),
            }),
        }
    }

    async fn attempt(
        &self,
        ctx: &dyn NavigationContext,
        url: &str,
    ) -> Result<ListingRecord, ExtractError> {
        ctx.navigate(url, self.navigation_timeout).await?;
        ctx.wait_for_selector(CONTENT_CONTAINER, self.content_timeout)
            .await?;
        let html = ctx.content().await?;

        let document = Html::parse_document(&html);
        Ok(parse_listing(&document, url, &self.rules)?)
    }
}
