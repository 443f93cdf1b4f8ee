//! Prometheus metrics for the converter worker
//!
//! This module provides metrics tracking for:
//! - Registration: attempts per node and their result
//! - Pipeline: accepted jobs, outcomes, durations, in-flight count
//! - Reporting: delivered and undelivered status reports, auth rejections
//! - Intake: per-path request timing
//!
//! Metrics live in their own [`Registry`] owned by a [`Metrics`] value that is
//! passed into each component, so tests can build isolated instances.

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use crate::models::JobStatus;

/// Shared handle to the metrics sink
pub type SharedMetrics = Arc<Metrics>;

/// Container for all converter metrics
pub struct Metrics {
    registry: Registry,
    registration_attempts: IntCounterVec,
    jobs_accepted: IntCounter,
    jobs_finished: IntCounterVec,
    step_failures: IntCounterVec,
    jobs_in_flight: IntGauge,
    pipeline_duration: HistogramVec,
    reports: IntCounterVec,
    report_auth_failures: IntCounter,
    cleanup_errors: CounterVec,
    method_timing: HistogramVec,
}

impl Metrics {
    /// Create and register all metrics in a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let registration_attempts = IntCounterVec::new(
            Opts::new(
                "converter_registration_attempts_total",
                "Registration attempts by coordinator node and result",
            ),
            &["node", "result"],
        )?;
        let jobs_accepted = IntCounter::new(
            "converter_jobs_accepted_total",
            "Total jobs accepted on the intake endpoint",
        )?;
        let jobs_finished = IntCounterVec::new(
            Opts::new("converter_jobs_finished_total", "Finished jobs by status"),
            &["status"],
        )?;
        let step_failures = IntCounterVec::new(
            Opts::new(
                "converter_step_failures_total",
                "Pipeline failures by the step that failed",
            ),
            &["step"],
        )?;
        let jobs_in_flight = IntGauge::new(
            "converter_jobs_in_flight",
            "Jobs currently executing a pipeline",
        )?;
        let pipeline_duration = HistogramVec::new(
            HistogramOpts::new(
                "converter_pipeline_duration_seconds",
                "Time from download start to status report",
            )
            .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
            &["status"],
        )?;
        let reports = IntCounterVec::new(
            Opts::new(
                "converter_status_reports_total",
                "Status reports sent to the coordinator by result",
            ),
            &["result"],
        )?;
        let report_auth_failures = IntCounter::new(
            "converter_report_auth_failures_total",
            "Status reports rejected by the coordinator with 401/403",
        )?;
        let cleanup_errors = CounterVec::new(
            Opts::new(
                "converter_cleanup_errors_total",
                "Temporary file removals that failed",
            ),
            &["kind"],
        )?;
        let method_timing = HistogramVec::new(
            HistogramOpts::new("converter_method_timing", "per method time")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method"],
        )?;

        registry.register(Box::new(registration_attempts.clone()))?;
        registry.register(Box::new(jobs_accepted.clone()))?;
        registry.register(Box::new(jobs_finished.clone()))?;
        registry.register(Box::new(step_failures.clone()))?;
        registry.register(Box::new(jobs_in_flight.clone()))?;
        registry.register(Box::new(pipeline_duration.clone()))?;
        registry.register(Box::new(reports.clone()))?;
        registry.register(Box::new(report_auth_failures.clone()))?;
        registry.register(Box::new(cleanup_errors.clone()))?;
        registry.register(Box::new(method_timing.clone()))?;

        Ok(Self {
            registry,
            registration_attempts,
            jobs_accepted,
            jobs_finished,
            step_failures,
            jobs_in_flight,
            pipeline_duration,
            reports,
            report_auth_failures,
            cleanup_errors,
            method_timing,
        })
    }

    /// Create a shared handle
    pub fn shared() -> Result<SharedMetrics, prometheus::Error> {
        Ok(Arc::new(Self::new()?))
    }

    /// Encode all metrics to Prometheus text format
    pub fn encode(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_registration_attempt(&self, node: &str, success: bool) {
        let result = if success { "success" } else { "failure" };
        self.registration_attempts
            .with_label_values(&[node, result])
            .inc();
    }

    pub fn record_job_accepted(&self) {
        self.jobs_accepted.inc();
    }

    pub fn jobs_accepted(&self) -> u64 {
        self.jobs_accepted.get()
    }

    pub fn record_step_failure(&self, step: &str) {
        self.step_failures.with_label_values(&[step]).inc();
    }

    pub fn record_job_finished(&self, status: JobStatus, duration_secs: f64) {
        self.jobs_finished
            .with_label_values(&[status.as_str()])
            .inc();
        self.pipeline_duration
            .with_label_values(&[status.as_str()])
            .observe(duration_secs);
    }

    pub fn jobs_finished(&self, status: JobStatus) -> u64 {
        self.jobs_finished
            .with_label_values(&[status.as_str()])
            .get()
    }

    /// Record the result of a status report
    pub fn record_report(&self, delivered: bool, auth_rejected: bool) {
        let result = if delivered { "delivered" } else { "failed" };
        self.reports.with_label_values(&[result]).inc();

        if auth_rejected {
            self.report_auth_failures.inc();
        }
    }

    pub fn report_auth_failures(&self) -> u64 {
        self.report_auth_failures.get()
    }

    pub fn record_cleanup_error(&self, kind: &str) {
        self.cleanup_errors.with_label_values(&[kind]).inc();
    }

    /// Record the handling time of an intake request
    pub fn observe_request(&self, method: &str, duration_secs: f64) {
        self.method_timing
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    /// Mark a job as executing until the returned guard is dropped
    pub fn track_in_flight(self: &Arc<Self>) -> InFlightGuard {
        self.jobs_in_flight.inc();
        InFlightGuard {
            metrics: Arc::clone(self),
            started: Instant::now(),
        }
    }

    pub fn jobs_in_flight(&self) -> i64 {
        self.jobs_in_flight.get()
    }
}

/// Gauge guard that decrements the in-flight count on drop
pub struct InFlightGuard {
    metrics: SharedMetrics,
    started: Instant,
}

impl InFlightGuard {
    /// Seconds since the job started executing
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.jobs_in_flight.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_registries() {
        // Two instances must not collide on metric names
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();

        a.record_job_accepted();
        assert_eq!(a.jobs_accepted(), 1);
        assert_eq!(b.jobs_accepted(), 0);
    }

    #[test]
    fn test_in_flight_guard() {
        let metrics = Metrics::shared().unwrap();
        {
            let _guard = metrics.track_in_flight();
            assert_eq!(metrics.jobs_in_flight(), 1);
        }
        assert_eq!(metrics.jobs_in_flight(), 0);
    }

    #[test]
    fn test_encode_contains_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.record_job_finished(JobStatus::Done, 1.5);
        metrics.record_report(false, true);
        metrics.observe_request("/api/v1/processing", 0.002);

        let text = metrics.encode().unwrap();
        assert!(text.contains("converter_jobs_finished_total"));
        assert!(text.contains("converter_report_auth_failures_total 1"));
        assert!(text.contains("converter_method_timing"));
        assert_eq!(metrics.jobs_finished(JobStatus::Done), 1);
        assert_eq!(metrics.report_auth_failures(), 1);
    }
}
