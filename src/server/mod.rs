//! Job intake server
//!
//! # Routes
//!
//! ```text
//! POST /api/v1/processing   accept a job, 200 before the pipeline starts
//! GET  /api/v1/health       liveness and current coordinator
//! GET  /metrics             Prometheus exposition
//! ```

pub mod api;
pub mod intake;

pub use api::create_router;
pub use intake::{AppState, IntakeServer, ServerError};
