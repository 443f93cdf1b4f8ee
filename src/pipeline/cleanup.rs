//! Temporary file cleanup
//!
//! Removal failures are logged and counted, never propagated.

use std::io;
use std::path::{Path, PathBuf};

use crate::metrics::SharedMetrics;

/// Removes the downloaded source file when dropped, on every exit path
pub struct SourceFileGuard {
    path: PathBuf,
    metrics: SharedMetrics,
}

impl SourceFileGuard {
    pub fn new(path: PathBuf, metrics: SharedMetrics) -> Self {
        Self { path, metrics }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SourceFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed source file"),
            Err(e) => log_removal_error(&self.path, &e, "source", &self.metrics),
        }
    }
}

/// Remove a converted output file that will not be picked up
pub async fn remove_output(path: &Path, metrics: &SharedMetrics) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::info!(path = %path.display(), "Removed unacknowledged output file"),
        Err(e) => log_removal_error(path, &e, "output", metrics),
    }
}

fn log_removal_error(path: &Path, error: &io::Error, kind: &str, metrics: &SharedMetrics) {
    // Nothing was written yet
    if error.kind() == io::ErrorKind::NotFound {
        tracing::debug!(path = %path.display(), kind, "No file to remove");
        return;
    }

    metrics.record_cleanup_error(kind);
    tracing::warn!(path = %path.display(), kind, error = %error, "Failed to remove temporary file");
}
