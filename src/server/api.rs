//! REST API handlers for the job intake
//!
//! This module defines the API routes and handlers of the worker.

use axum::{
    body::Bytes,
    extract::{MatchedPath, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::time::Instant;

use crate::models::Job;
use crate::pipeline::PoolError;

use super::intake::AppState;

/// Error message returned for malformed job payloads
pub const INVALID_REQUEST: &str = "Invalid request.";

// ============================================================================
// API Response Types
// ============================================================================

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub coordinator: String,
    /// Pipelines currently executing
    pub in_flight_jobs: i64,
    /// Accepted jobs not yet finished, including those waiting for a slot
    pub pending_jobs: usize,
    pub max_concurrent_jobs: usize,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/processing", post(submit_job))
        .route("/api/v1/health", get(health_check))
        .route("/metrics", get(metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_timing))
        .with_state(state)
}

/// Per-route handling time
async fn track_timing(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let start = Instant::now();
    let response = next.run(request).await;
    state
        .metrics
        .observe_request(&path, start.elapsed().as_secs_f64());

    response
}

// ============================================================================
// Job Handlers
// ============================================================================

/// Accept a job and launch it without waiting for the result.
///
/// The body is decoded as JSON regardless of the `Content-Type` header.
async fn submit_job(State(state): State<AppState>, body: Bytes) -> Response {
    let job = match parse_job(&body) {
        Ok(job) => job,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected malformed job payload");
            return invalid_request();
        }
    };

    if let Err(e) = job.validate() {
        tracing::debug!(job_id = %job.job_id, error = %e, "Rejected invalid job");
        return invalid_request();
    }

    match state.pool.submit(job) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(PoolError::ShuttingDown) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Worker is shutting down")),
        )
            .into_response(),
    }
}

fn parse_job(body: &[u8]) -> Result<Job, serde_json::Error> {
    serde_json::from_slice(body)
}

fn invalid_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(INVALID_REQUEST)),
    )
        .into_response()
}

// ============================================================================
// Health and Metrics Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        coordinator: state.session.base_url().to_string(),
        in_flight_jobs: state.metrics.jobs_in_flight(),
        pending_jobs: state.pool.pending(),
        max_concurrent_jobs: state.pool.max_concurrent(),
    })
}

/// Prometheus exposition endpoint
async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
