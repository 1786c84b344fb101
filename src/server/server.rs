//! Crawl server implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use super::api::create_router;
use crate::config::ServerConfig;
use crate::crawler::CrawlOrchestrator;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Crawl orchestrator used by `/run`
    pub orchestrator: Arc<CrawlOrchestrator>,

    /// Held for the duration of a crawl
    pub run_lock: Arc<Mutex<()>>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<CrawlOrchestrator>) -> Self {
        Self {
            orchestrator,
            run_lock: Arc::new(Mutex::new(())),
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Crawl Server
// ============================================================================

/// HTTP server exposing the crawl trigger
pub struct CrawlServer {
    config: ServerConfig,
    state: AppState,
}

impl CrawlServer {
    pub fn new(orchestrator: Arc<CrawlOrchestrator>, config: ServerConfig) -> Self {
        Self {
            config,
            state: AppState::new(orchestrator),
        }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind_address
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = create_router(self.state.clone());

        if self.config.enable_request_logging {
            router.layer(TraceLayer::new_for_http())
        } else {
            router
        }
    }

    /// Serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                reason: e.to_string(),
            })?;

        tracing::info!("Listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug, Clone)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: SocketAddr, reason: String },

    /// Server error
    #[error("Server error: {0}")]
    Serve(String),
}
