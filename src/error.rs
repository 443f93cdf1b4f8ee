//! Unified error handling for the converter crate
//!
//! Domain modules keep their own error enums; this module wraps them into a
//! single [`Error`] used at component boundaries (startup, serving).
//!
//! # Usage
//!
//! ```rust,ignore
//! use converter::error::{Error, ErrorCategory};
//!
//! fn handle(err: Error) {
//!     if err.is_fatal() {
//!         eprintln!("cannot start: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::coordinator::{ClientError, RegistrationError};
pub use crate::pipeline::{PipelineError, PoolError};
pub use crate::server::ServerError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Coordinator discovery and reporting
    Coordinator,
    /// Download, persist or convert step of a job
    Pipeline,
    /// HTTP intake server
    Server,
    /// File system errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Metrics registration
    Metrics,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::Pipeline => "pipeline",
            Self::Server => "server",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Metrics => "metrics",
        }
    }
}

/// Unified error type for the converter crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Registration failed on every coordinator node
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// Coordinator client errors
    #[error("Coordinator client error: {0}")]
    Client(#[from] ClientError),

    /// Job pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Intake server errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Metrics registration errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Registration(_) | Self::Client(_) => ErrorCategory::Coordinator,
            Self::Pipeline(_) => ErrorCategory::Pipeline,
            Self::Server(_) => ErrorCategory::Server,
            Self::Metrics(_) => ErrorCategory::Metrics,
            Self::Io(_) => ErrorCategory::Storage,
        }
    }

    /// Errors that must stop the process before it serves traffic
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Registration(_) | Self::Config(_))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
