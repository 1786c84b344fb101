//! HTML parsing and data extraction
//!
//! This module turns rendered makler.md pages into structured data: the
//! seed profile page into a list of listing URLs, and each listing page
//! into a [`ListingRecord`](crate::models::ListingRecord).

pub mod listing;
pub mod selectors;

// Re-export main parser entry points
pub use listing::{extract_target_links, parse_listing, ExtractionRules};
pub use selectors::CONTENT_CONTAINER;
