//! Intake endpoint and job pool tests

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{build_pipeline, mount_media, mount_register, node_for, FakeBehavior, FakeTranscoder};
use converter::config::Config;
use converter::metrics::Metrics;
use converter::models::{Job, JobStatus};
use converter::pipeline::{JobPool, PoolError, Transcoder};
use converter::worker::Worker;

async fn mount_reports(coordinator: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/converter/job"))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected)
        .mount(coordinator)
        .await;
}

async fn start_worker(
    coordinator: &MockServer,
    work_dir: &std::path::Path,
    transcoder: Arc<dyn Transcoder>,
) -> Worker {
    mount_register(coordinator, "T").await;

    let mut config = Config::default();
    config.coordinator.nodes = vec![node_for(coordinator)];
    config.server.enable_request_logging = false;
    config.worker.work_dir = work_dir.to_path_buf();

    Worker::register_with(config, transcoder, Metrics::shared().unwrap())
        .await
        .unwrap()
}

fn processing_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/processing")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Valid job: 200 with empty body, the job runs and is reported afterwards
#[tokio::test]
async fn test_accepts_job_and_reports_later() {
    let media = MockServer::start().await;
    mount_media(&media).await;
    let coordinator = MockServer::start().await;
    mount_reports(&coordinator, 1).await;
    let work_dir = tempfile::tempdir().unwrap();

    let worker = start_worker(
        &coordinator,
        work_dir.path(),
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed)),
    )
    .await;

    let body = serde_json::json!({
        "job_id": "abc",
        "link": format!("{}/video.mp4", media.uri()),
    })
    .to_string();
    let response = worker
        .router()
        .oneshot(processing_request(&body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(body_string(response).await.is_empty());

    assert!(worker.pool().shutdown(Duration::from_secs(5)).await);
    assert_eq!(worker.metrics().jobs_accepted(), 1);
    assert_eq!(worker.metrics().jobs_finished(JobStatus::Done), 1);
}

/// The body is decoded as JSON even without a content type header
#[tokio::test]
async fn test_accepts_job_without_content_type() {
    let media = MockServer::start().await;
    mount_media(&media).await;
    let coordinator = MockServer::start().await;
    mount_reports(&coordinator, 2).await;
    let work_dir = tempfile::tempdir().unwrap();

    let worker = start_worker(
        &coordinator,
        work_dir.path(),
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed)),
    )
    .await;

    let link = format!("{}/video.mp4", media.uri());
    let bare = Request::builder()
        .method("POST")
        .uri("/api/v1/processing")
        .body(Body::from(
            serde_json::json!({ "job_id": "bare", "link": link }).to_string(),
        ))
        .unwrap();
    let plain = Request::builder()
        .method("POST")
        .uri("/api/v1/processing")
        .header("content-type", "text/plain")
        .body(Body::from(
            serde_json::json!({ "job_id": "plain", "link": link }).to_string(),
        ))
        .unwrap();

    for request in [bare, plain] {
        let response = worker.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert!(worker.pool().shutdown(Duration::from_secs(5)).await);
    assert_eq!(worker.metrics().jobs_finished(JobStatus::Done), 2);
}

/// Malformed JSON is rejected with the fixed error message
#[tokio::test]
async fn test_rejects_malformed_json() {
    let coordinator = MockServer::start().await;
    mount_reports(&coordinator, 0).await;
    let work_dir = tempfile::tempdir().unwrap();
    let worker = start_worker(
        &coordinator,
        work_dir.path(),
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed)),
    )
    .await;

    let response = worker
        .router()
        .oneshot(processing_request("{\"job_id\": "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Invalid request."));
    assert_eq!(worker.metrics().jobs_accepted(), 0);
}

/// Missing fields and unsafe ids are rejected before any job starts
#[tokio::test]
async fn test_rejects_invalid_jobs() {
    let coordinator = MockServer::start().await;
    mount_reports(&coordinator, 0).await;
    let work_dir = tempfile::tempdir().unwrap();
    let worker = start_worker(
        &coordinator,
        work_dir.path(),
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed)),
    )
    .await;

    let payloads = [
        r#"{"job_id": "abc"}"#,
        r#"{"job_id": "../etc", "link": "http://example/video.mp4"}"#,
        r#"{"job_id": "", "link": "http://example/video.mp4"}"#,
        r#"{"job_id": "abc", "link": "ftp://example/video.mp4"}"#,
        r#"{"job_id": "abc", "link": "not a url"}"#,
    ];

    for payload in payloads {
        let response = worker
            .router()
            .oneshot(processing_request(payload))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload should be rejected: {payload}"
        );
    }

    assert_eq!(worker.metrics().jobs_accepted(), 0);
}

/// Once the pool is closed new jobs get 503
#[tokio::test]
async fn test_rejects_jobs_while_shutting_down() {
    let coordinator = MockServer::start().await;
    mount_reports(&coordinator, 0).await;
    let work_dir = tempfile::tempdir().unwrap();
    let worker = start_worker(
        &coordinator,
        work_dir.path(),
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed)),
    )
    .await;

    assert!(worker.pool().shutdown(Duration::from_secs(1)).await);

    let response = worker
        .router()
        .oneshot(processing_request(
            r#"{"job_id": "late", "link": "http://example/video.mp4"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_endpoint() {
    let coordinator = MockServer::start().await;
    let work_dir = tempfile::tempdir().unwrap();
    let worker = start_worker(
        &coordinator,
        work_dir.path(),
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed)),
    )
    .await;

    let response = worker
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["in_flight_jobs"], 0);
    assert_eq!(health["pending_jobs"], 0);
    assert_eq!(health["max_concurrent_jobs"], 4);
    assert_eq!(
        health["coordinator"],
        format!("http://{}/api/v1/converter", coordinator.address())
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let coordinator = MockServer::start().await;
    let work_dir = tempfile::tempdir().unwrap();
    let worker = start_worker(
        &coordinator,
        work_dir.path(),
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed)),
    )
    .await;

    let response = worker
        .router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(text.contains("converter_registration_attempts_total"));
}

/// Never more pipelines converting than the pool allows
#[tokio::test]
async fn test_pool_bounds_concurrency() {
    let media = MockServer::start().await;
    mount_media(&media).await;
    let coordinator = MockServer::start().await;
    mount_reports(&coordinator, 5).await;
    let work_dir = tempfile::tempdir().unwrap();

    let transcoder =
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed).with_delay(Duration::from_millis(150)));
    let (pipeline, metrics) = build_pipeline(&coordinator, work_dir.path(), transcoder.clone());
    let pool = JobPool::new(pipeline, 2);

    for i in 0..5 {
        let link = Url::parse(&format!("{}/video.mp4", media.uri())).unwrap();
        pool.submit(Job::new(format!("job-{i}"), link)).unwrap();
    }

    assert!(pool.shutdown(Duration::from_secs(10)).await);
    assert_eq!(transcoder.calls(), 5);
    assert!(transcoder.peak_running() <= 2);
    assert_eq!(metrics.jobs_finished(JobStatus::Done), 5);
}

/// Drain gives up after the timeout and the pool stays closed
#[tokio::test]
async fn test_pool_drain_timeout() {
    let media = MockServer::start().await;
    mount_media(&media).await;
    let coordinator = MockServer::start().await;
    mount_reports(&coordinator, 1).await;
    let work_dir = tempfile::tempdir().unwrap();

    let transcoder =
        Arc::new(FakeTranscoder::new(FakeBehavior::Succeed).with_delay(Duration::from_secs(1)));
    let (pipeline, _metrics) = build_pipeline(&coordinator, work_dir.path(), transcoder);
    let pool = JobPool::new(pipeline, 1);

    let link = Url::parse(&format!("{}/video.mp4", media.uri())).unwrap();
    pool.submit(Job::new("long", link.clone())).unwrap();

    assert!(!pool.shutdown(Duration::from_millis(50)).await);
    assert!(pool.is_closed());
    assert_eq!(
        pool.submit(Job::new("late", link)),
        Err(PoolError::ShuttingDown)
    );

    // Let the running job finish so the report expectation holds
    assert!(pool.shutdown(Duration::from_secs(5)).await);
}
