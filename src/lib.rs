//! makler-crawler - makler.md listing crawler
//!
//! Collects listing statistics from a makler.md seller profile through a
//! remote headless browser and forwards them to an ingestion API.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration from environment variables or TOML
//! - [`browser`] - Remote browser sessions, contexts and resource filtering
//! - [`parser`] - Listing and seed page parsing
//! - [`crawler`] - Per-page extraction and run orchestration
//! - [`sink`] - Submission of the aggregated batch
//! - [`server`] - HTTP trigger and health endpoints
//! - [`models`] - Core data structures and types
//! - [`utils`] - Retry helper, domain errors and text utilities
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use makler_crawler::browser::ChromiumConnector;
//! use makler_crawler::config::Config;
//! use makler_crawler::crawler::CrawlOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let orchestrator = CrawlOrchestrator::from_config(Arc::new(ChromiumConnector), &config)?;
//!     let result = orchestrator.run().await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod server;
pub mod sink;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::browser::{ResourceFilter, SessionManager};
    pub use crate::config::Config;
    pub use crate::crawler::{CrawlOrchestrator, PageExtractor};
    pub use crate::error::{Error, ErrorCategory, MaklerErrorTrait, Result};
    pub use crate::models::{CrawlBatch, CrawlReport, CrawlStats, ListingRecord};
    pub use crate::sink::{ApiSink, ResultSink};
}

// Direct re-exports for convenience
pub use models::{CrawlBatch, CrawlStats, ListingRecord};
