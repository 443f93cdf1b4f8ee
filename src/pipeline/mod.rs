//! Job execution pipeline
//!
//! Each accepted job runs through a strictly sequential pipeline inside its own
//! task. Any failing step short-circuits to the status report.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ Download │──▶│ Persist  │──▶│ Convert  │──▶│  Source  │──▶│  Report  │
//! │  (GET)   │   │ {id}.avi │   │ (ffmpeg) │   │ cleanup  │   │ done/fail│
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘   └──────────┘
//!      │              │              │                              │
//!      └──────────────┴──────────────┴── failure ──────────────────▶│
//!                                                                   ▼
//!                                                      output removed if the
//!                                                      report was not delivered
//! ```
//!
//! Jobs are scheduled on a [`JobPool`] that bounds the number of pipelines
//! executing at once and drains in-flight jobs on shutdown.

pub mod cleanup;
pub mod fetcher;
pub mod pool;
pub mod runner;
pub mod transcoder;

use std::time::Duration;
use thiserror::Error;

pub use fetcher::MediaFetcher;
pub use pool::{JobPool, PoolError};
pub use runner::{JobPipeline, JobReport};
pub use transcoder::{audio_path_for, FfmpegTranscoder, Transcoder};

/// Extension used for downloaded source files
pub const SOURCE_EXTENSION: &str = "avi";

/// Failure of a single pipeline step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("download returned HTTP {0}")]
    DownloadStatus(u16),

    #[error("failed to write {path}: {reason}")]
    Persist { path: String, reason: String },

    #[error("audio extraction failed: {0}")]
    Convert(String),

    #[error("{step} step timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },
}

impl PipelineError {
    /// Name of the step that failed
    pub fn step(&self) -> &'static str {
        match self {
            Self::Download(_) | Self::DownloadStatus(_) => "download",
            Self::Persist { .. } => "persist",
            Self::Convert(_) => "convert",
            Self::Timeout { step, .. } => step,
        }
    }
}
