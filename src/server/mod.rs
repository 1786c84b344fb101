//! HTTP trigger and health endpoints
//!
//! ```text
//! POST /run   run one crawl and return the ingestion response
//! GET  /test  liveness check
//! ```
//!
//! Only one crawl runs at a time; a `/run` arriving while another is in
//! progress is rejected with `409 Conflict`.
//!
//! # Usage
//!
//! ```ignore
//! use makler_crawler::server::CrawlServer;
//!
//! let server = CrawlServer::new(orchestrator, config.server.clone());
//! server.start_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod server;

pub use api::{create_router, RunResponse, StatusResponse};
pub use server::{AppState, CrawlServer, ServerError};
