//! Listing crawl
//!
//! [`PageExtractor`] turns one listing URL into a record on a given
//! navigation context, retrying in place. [`CrawlOrchestrator`] owns the
//! run: it enumerates listings from the seed page, escalates context loss
//! to fresh contexts and submits the batch.

pub mod extractor;
pub mod orchestrator;

pub use extractor::PageExtractor;
pub use orchestrator::{CrawlOrchestrator, UrlState};
