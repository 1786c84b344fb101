// Core data structures for the makler crawler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Structured fields extracted from one listing detail page
///
/// Serialized as the element type of the JSON array posted to the
/// ingestion API; optional fields become `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub url: String,
    pub title: Option<String>,
    pub city: Option<String>,
    pub views: Option<u64>,
    /// Comma-joined job-posting links found in the listing body
    pub target_urls: String,
}

/// Ordered collection of successfully extracted listings for one run
///
/// Only successes are appended; a rejected URL leaves no entry behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CrawlBatch {
    records: Vec<ListingRecord>,
}

impl CrawlBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ListingRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.url.as_str())
    }

    pub fn into_records(self) -> Vec<ListingRecord> {
        self.records
    }
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub targets_found: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// URLs that had to be retried on a fresh context
    pub escalations: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Success rate as a percentage of the targets found
    pub fn success_rate(&self) -> f64 {
        if self.targets_found == 0 {
            0.0
        } else {
            (self.accepted as f64 / self.targets_found as f64) * 100.0
        }
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Outcome of a completed crawl, before submission
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub batch: CrawlBatch,
    pub stats: CrawlStats,
}
