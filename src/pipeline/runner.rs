//! Single-job pipeline execution
//!
//! A run always ends with exactly one status report. Step failures are carried
//! as `Result` values up to the report instead of being raised to the caller.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

use crate::coordinator::{CoordinatorClient, CoordinatorSession};
use crate::metrics::SharedMetrics;
use crate::models::{Job, JobOutcome, JobStatus};

use super::cleanup::{remove_output, SourceFileGuard};
use super::fetcher::MediaFetcher;
use super::transcoder::{audio_path_for, Transcoder};
use super::{PipelineError, SOURCE_EXTENSION};

// ============================================================================
// Job Report
// ============================================================================

/// Summary of a finished pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Outcome sent to the coordinator
    pub outcome: JobOutcome,

    /// Whether the coordinator acknowledged the outcome
    pub delivered: bool,

    /// Output path kept after a delivered report (conversion was attempted)
    pub output: Option<PathBuf>,
}

impl JobReport {
    pub fn status(&self) -> JobStatus {
        self.outcome.status
    }
}

// ============================================================================
// Job Pipeline
// ============================================================================

/// Executes jobs: download, persist, convert, report
pub struct JobPipeline {
    fetcher: MediaFetcher,
    transcoder: Arc<dyn Transcoder>,
    client: CoordinatorClient,
    session: Arc<CoordinatorSession>,
    work_dir: PathBuf,
    metrics: SharedMetrics,
}

impl JobPipeline {
    pub fn new(
        fetcher: MediaFetcher,
        transcoder: Arc<dyn Transcoder>,
        client: CoordinatorClient,
        session: Arc<CoordinatorSession>,
        work_dir: impl Into<PathBuf>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            fetcher,
            transcoder,
            client,
            session,
            work_dir: work_dir.into(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Temp path of the downloaded source for a job
    pub fn source_path(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(format!("{job_id}.{SOURCE_EXTENSION}"))
    }

    /// Run a job to completion and report its outcome
    pub async fn run(&self, job: Job) -> JobReport {
        let span = tracing::info_span!("job", job_id = %job.job_id);
        self.run_job(job).instrument(span).await
    }

    async fn run_job(&self, job: Job) -> JobReport {
        let in_flight = self.metrics.track_in_flight();
        let mut output = None;

        let status = match self.execute(&job, &mut output).await {
            Ok(path) => {
                tracing::info!(output = %path.display(), "Completed successfully");
                JobStatus::Done
            }
            Err(e) => {
                self.metrics.record_step_failure(e.step());
                tracing::warn!(step = e.step(), error = %e, "Job failed");
                JobStatus::Fail
            }
        };

        let outcome = JobOutcome::new(job.job_id, status);
        let delivered = self.report(&outcome).await;

        if !delivered {
            if let Some(path) = output.take() {
                remove_output(&path, &self.metrics).await;
            }
        }

        self.metrics
            .record_job_finished(status, in_flight.elapsed_secs());

        JobReport {
            outcome,
            delivered,
            output,
        }
    }

    /// Work steps. The source guard is dropped on return, before the report.
    async fn execute(
        &self,
        job: &Job,
        output: &mut Option<PathBuf>,
    ) -> Result<PathBuf, PipelineError> {
        tracing::debug!(link = %job.link, "Downloading source");
        let data = self.fetcher.fetch(&job.link).await?;

        let source = self.source_path(&job.job_id);
        let _source_guard = SourceFileGuard::new(source.clone(), self.metrics.clone());

        tokio::fs::write(&source, &data)
            .await
            .map_err(|e| PipelineError::Persist {
                path: source.display().to_string(),
                reason: e.to_string(),
            })?;
        drop(data);

        let audio = audio_path_for(&source);
        *output = Some(audio.clone());

        tracing::debug!(
            transcoder = self.transcoder.name(),
            source = %source.display(),
            "Extracting audio"
        );
        self.transcoder.extract_audio(&source, &audio).await?;

        Ok(audio)
    }

    /// Send the outcome; returns whether the coordinator acknowledged it
    async fn report(&self, outcome: &JobOutcome) -> bool {
        match self.client.report(&self.session, outcome).await {
            Ok(()) => {
                self.metrics.record_report(true, false);
                tracing::debug!(status = %outcome.status, "Status reported");
                true
            }
            Err(e) => {
                let auth_rejected = e.is_auth_failure();
                self.metrics.record_report(false, auth_rejected);

                if auth_rejected {
                    tracing::warn!(
                        status = %outcome.status,
                        error = %e,
                        "Coordinator rejected the session token"
                    );
                } else {
                    tracing::warn!(
                        status = %outcome.status,
                        error = %e,
                        "Coordinator did not acknowledge status report"
                    );
                }
                false
            }
        }
    }
}
