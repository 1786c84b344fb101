//! REST API handlers
//!
//! This module defines the routes and handlers of the crawl service.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::server::AppState;
use crate::error::MaklerErrorTrait;

// ============================================================================
// API Response Types
// ============================================================================

/// Outcome of a completed `/run`
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub status: &'static str,
    pub result: Option<Value>,
}

/// Status message used by `/test` and by error responses
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/run", post(run_crawl))
        .route("/test", get(health_check))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Run one crawl synchronously
async fn run_crawl(State(state): State<AppState>) -> Response {
    let Ok(_guard) = state.run_lock.try_lock() else {
        warn!("Rejecting /run while another crawl is in progress");
        return (
            StatusCode::CONFLICT,
            Json(StatusResponse::error("A crawl is already in progress")),
        )
            .into_response();
    };

    info!("Crawl triggered over HTTP");
    match state.orchestrator.run().await {
        Ok(result) => (
            StatusCode::OK,
            Json(RunResponse {
                status: "success",
                result,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(
                error = %e,
                category = e.category().as_str(),
                recoverable = e.is_recoverable(),
                "Crawl failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Liveness check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!(uptime_secs = state.start_time.elapsed().as_secs(), "Health check");
    Json(StatusResponse::ok("Service healthy"))
}

// ============================================================================
// Tests
// ============================================================================
