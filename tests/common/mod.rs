//! Common test utilities

use async_trait::async_trait;
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use converter::coordinator::{ClientConfig, CoordinatorClient, CoordinatorSession};
use converter::metrics::{Metrics, SharedMetrics};
use converter::models::Node;
use converter::pipeline::{JobPipeline, MediaFetcher, PipelineError, Transcoder};

/// Stand-in for ffmpeg
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Write the output file and succeed
    Succeed,
    /// Fail without touching the output path
    Fail,
    /// Write a partial output file, then fail
    FailWithPartialOutput,
}

pub struct FakeTranscoder {
    behavior: FakeBehavior,
    delay: Duration,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

#[allow(dead_code)]
impl FakeTranscoder {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak_running: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of conversions observed running at once
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn extract_audio(&self, source: &Path, output: &Path) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        assert!(source.exists(), "source must be persisted before conversion");

        let result = match self.behavior {
            FakeBehavior::Succeed => {
                tokio::fs::write(output, b"ID3audio").await.unwrap();
                Ok(())
            }
            FakeBehavior::Fail => Err(PipelineError::Convert("exit status: 1".to_string())),
            FakeBehavior::FailWithPartialOutput => {
                tokio::fs::write(output, b"ID3").await.unwrap();
                Err(PipelineError::Convert("exit status: 1".to_string()))
            }
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Node address of a running mock server
pub fn node_for(server: &MockServer) -> Node {
    Node::parse(&server.address().to_string()).unwrap()
}

/// Node address nothing listens on
#[allow(dead_code)]
pub fn refused_node() -> Node {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    Node::parse(&address.to_string()).unwrap()
}

/// Answer registration with the given token
#[allow(dead_code)]
pub async fn mount_register(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/converter/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })))
        .mount(server)
        .await;
}

/// Serve a small media file at `/video.mp4`
#[allow(dead_code)]
pub async fn mount_media(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF....AVI LIST".to_vec()))
        .mount(server)
        .await;
}

/// Client with short timeouts for tests
pub fn test_client() -> CoordinatorClient {
    CoordinatorClient::new(
        ClientConfig::default()
            .with_register_timeout(Duration::from_secs(2))
            .with_report_timeout(Duration::from_secs(2)),
    )
    .unwrap()
}

/// Pipeline reporting to `coordinator` with token `T`
#[allow(dead_code)]
pub fn build_pipeline(
    coordinator: &MockServer,
    work_dir: &Path,
    transcoder: Arc<dyn Transcoder>,
) -> (Arc<JobPipeline>, SharedMetrics) {
    let metrics = Metrics::shared().unwrap();
    let session = Arc::new(CoordinatorSession::new(&node_for(coordinator), "T"));
    let fetcher = MediaFetcher::new(Some(Duration::from_secs(5))).unwrap();

    let pipeline = JobPipeline::new(
        fetcher,
        transcoder,
        test_client(),
        session,
        work_dir,
        Arc::clone(&metrics),
    );

    (Arc::new(pipeline), metrics)
}

/// Names of all files left in `dir`
#[allow(dead_code)]
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
