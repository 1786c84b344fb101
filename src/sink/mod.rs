//! Result submission
//!
//! A crawl hands its finished batch to a [`ResultSink`]. Submission is best
//! effort: it happens once, is never retried, and a failure only turns the
//! run result into `null`.

pub mod api;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::ListingRecord;

pub use api::ApiSink;

/// Receives the aggregated batch at the end of a run
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Submit `records` and return the parsed response, or `None` on any
    /// failure
    async fn submit(&self, records: &[ListingRecord]) -> Option<Value>;
}
