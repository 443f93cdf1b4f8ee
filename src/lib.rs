//! converter - media conversion worker node
//!
//! Accepts conversion jobs over HTTP, downloads the source media, extracts its
//! audio track with ffmpeg and reports the outcome to a coordinator node found
//! through a round-robin node directory.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading and validation
//! - [`coordinator`] - Node directory, registration with failover, status reports
//! - [`pipeline`] - Per-job download → convert → report pipeline and the job pool
//! - [`server`] - HTTP intake endpoint
//! - [`metrics`] - Prometheus metrics sink
//! - [`models`] - Core data structures
//! - [`worker`] - Startup assembly of all components
//!
//! # Example
//!
//! ```no_run
//! use converter::config::Config;
//! use converter::worker::Worker;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let worker = Worker::register(config).await?;
//!     worker.serve(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod worker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::coordinator::{CoordinatorClient, CoordinatorSession, NodeDirectory};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{Job, JobOutcome, JobStatus, Node};
    pub use crate::pipeline::{JobPipeline, JobPool, Transcoder};
    pub use crate::worker::Worker;
}

// Direct re-exports for convenience
pub use models::{Job, JobOutcome, JobStatus, Node};
