//! Intake server implementation
//!
//! This module provides the HTTP server that accepts jobs and hands them to
//! the job pool.

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderName;
use axum::Router;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::coordinator::CoordinatorSession;
use crate::metrics::SharedMetrics;
use crate::pipeline::JobPool;

use super::api::create_router;

const REQUEST_ID_HEADER: &str = "x-request-id";

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pool running accepted jobs
    pub pool: Arc<JobPool>,

    /// Metrics sink
    pub metrics: SharedMetrics,

    /// Active coordinator session
    pub session: Arc<CoordinatorSession>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        pool: Arc<JobPool>,
        metrics: SharedMetrics,
        session: Arc<CoordinatorSession>,
    ) -> Self {
        Self {
            pool,
            metrics,
            session,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Intake Server
// ============================================================================

/// HTTP server for the job intake endpoint
pub struct IntakeServer {
    config: ServerConfig,
    state: AppState,
}

impl IntakeServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self) -> Router {
        let router = create_router(self.state.clone());
        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

        let router = router
            .layer(CatchPanicLayer::new())
            .layer(PropagateRequestIdLayer::new(request_id.clone()));

        let router = if self.config.enable_request_logging {
            router.layer(TraceLayer::new_for_http())
        } else {
            router
        };

        router.layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// Serve until `shutdown_signal` resolves.
    ///
    /// In-flight jobs are not drained here; the caller shuts the pool down.
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("{addr}: {e}")))?;

        tracing::info!(address = %addr, "Intake server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Intake server stopped");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Error, Debug, Clone)]
pub enum ServerError {
    #[error("Failed to bind: {0}")]
    BindError(String),

    #[error("Server error: {0}")]
    ServeError(String),
}
