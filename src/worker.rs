//! Worker assembly
//!
//! Startup order: validate config, register with a coordinator, build the
//! pipeline and pool, then serve. Registration failure aborts startup before the
//! intake server binds.

use std::future::Future;
use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use crate::coordinator::{ClientConfig, CoordinatorClient, CoordinatorSession, NodeDirectory};
use crate::error::Result;
use crate::metrics::{Metrics, SharedMetrics};
use crate::pipeline::{FfmpegTranscoder, JobPipeline, JobPool, MediaFetcher, Transcoder};
use crate::server::{AppState, IntakeServer};

/// A registered worker ready to serve jobs
pub struct Worker {
    config: Config,
    metrics: SharedMetrics,
    session: Arc<CoordinatorSession>,
    pool: Arc<JobPool>,
}

impl Worker {
    /// Register with a coordinator using the ffmpeg transcoder from `config`
    pub async fn register(config: Config) -> Result<Self> {
        let transcoder = FfmpegTranscoder::new(&config.worker.ffmpeg_path)
            .with_timeout(config.worker.convert_timeout());
        Self::register_with(config, Arc::new(transcoder), Metrics::shared()?).await
    }

    /// Register with a coordinator using the given transcoder and metrics sink
    pub async fn register_with(
        config: Config,
        transcoder: Arc<dyn Transcoder>,
        metrics: SharedMetrics,
    ) -> Result<Self> {
        config.validate()?;

        let client = CoordinatorClient::new(
            ClientConfig::default()
                .with_register_timeout(config.register_timeout())
                .with_report_timeout(config.report_timeout()),
        )?;

        let mut directory = NodeDirectory::new(config.coordinator.nodes.clone())?;
        let session =
            Arc::new(CoordinatorSession::register(&client, &mut directory, &metrics).await?);

        tokio::fs::create_dir_all(&config.worker.work_dir).await?;

        let fetcher = MediaFetcher::new(config.worker.download_timeout())?;
        let pipeline = Arc::new(JobPipeline::new(
            fetcher,
            transcoder,
            client,
            Arc::clone(&session),
            config.worker.work_dir.clone(),
            Arc::clone(&metrics),
        ));
        let pool = Arc::new(JobPool::new(pipeline, config.worker.max_concurrent_jobs));

        Ok(Self {
            config,
            metrics,
            session,
            pool,
        })
    }

    pub fn session(&self) -> &CoordinatorSession {
        &self.session
    }

    pub fn pool(&self) -> &Arc<JobPool> {
        &self.pool
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    fn intake_server(&self) -> IntakeServer {
        let state = AppState::new(
            Arc::clone(&self.pool),
            Arc::clone(&self.metrics),
            Arc::clone(&self.session),
        );
        IntakeServer::new(self.config.server.clone(), state)
    }

    /// Router with every route and middleware, for embedding or testing
    pub fn router(&self) -> Router {
        self.intake_server().build_router()
    }

    /// Serve until `shutdown_signal` resolves, then drain pending jobs
    pub async fn serve(
        self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let served = self
            .intake_server()
            .start_with_shutdown(shutdown_signal)
            .await;

        let drained = self.pool.shutdown(self.config.drain_timeout()).await;
        if !drained {
            tracing::warn!("Exiting with unfinished jobs");
        }

        served.map_err(Into::into)
    }
}
