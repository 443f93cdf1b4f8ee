//! Managed task pool for accepted jobs
//!
//! Submission never blocks: every job gets its own task immediately, and the
//! task waits for a semaphore permit before its pipeline starts. Shutdown closes
//! the pool and waits for tracked tasks to finish, up to a drain timeout.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::models::Job;

use super::runner::JobPipeline;

/// Bounded pool running job pipelines
pub struct JobPool {
    pipeline: Arc<JobPipeline>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    max_concurrent: usize,
}

impl JobPool {
    /// Create a pool running at most `max_concurrent` pipelines at once
    pub fn new(pipeline: Arc<JobPipeline>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);

        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            tracker: TaskTracker::new(),
            max_concurrent,
        }
    }

    /// Launch a job without waiting for it
    pub fn submit(&self, job: Job) -> Result<(), PoolError> {
        if self.tracker.is_closed() {
            return Err(PoolError::ShuttingDown);
        }

        self.pipeline.metrics().record_job_accepted();
        tracing::info!(job_id = %job.job_id, link = %job.link, "Job accepted");

        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        let span = tracing::debug_span!("queued_job", job_id = %job.job_id);

        self.tracker.spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    tracing::warn!("Job pool closed before the job could start");
                    return;
                };

                pipeline.run(job).await;
            }
            .instrument(span),
        );

        Ok(())
    }

    /// Jobs accepted and not yet finished, including queued ones
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Stop accepting jobs and wait for pending ones.
    ///
    /// Returns `true` if every job finished within `drain_timeout`.
    pub async fn shutdown(&self, drain_timeout: Duration) -> bool {
        self.tracker.close();

        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!(pending, "Draining in-flight jobs");
        }

        match tokio::time::timeout(drain_timeout, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!("Job pool drained");
                true
            }
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracker.len(),
                    timeout = ?drain_timeout,
                    "Drain timeout reached with jobs still running"
                );
                false
            }
        }
    }
}

/// Pool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("job pool is shutting down")]
    ShuttingDown,
}
