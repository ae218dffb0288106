#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use greenroad::config::{Config, MetricsConfig};
use greenroad::metrics::Metrics;
use greenroad::routes::create_router;
use greenroad::state::AppState;
use greenroad::utils::access_log::MemoryAccessLog;
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub access_log: Arc<MemoryAccessLog>,
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/public")),
        random_seed: Some(42),
        metrics: MetricsConfig {
            process_metrics: false,
            ..MetricsConfig::default()
        },
        ..Config::default()
    }
}

/// State backed by an in-memory access log so tests can inspect records.
pub fn build_state(config: Config) -> (AppState, Arc<MemoryAccessLog>) {
    let access_log = Arc::new(MemoryAccessLog::new());
    let metrics = Metrics::new(&config.metrics).expect("metrics should build");
    let state = AppState::new(Arc::new(config), metrics, access_log.clone(), 0);
    (state, access_log)
}

pub fn build_app(config: Config) -> TestApp {
    let (state, access_log) = build_state(config);
    TestApp {
        router: create_router(state.clone()),
        state,
        access_log,
    }
}

pub fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn get(path: &str) -> Request<Body> {
    request(Method::GET, path)
}

/// Sends a request and reads the whole body, so the request is recorded
/// before this returns.
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("body should be readable");
    Response::from_parts(parts, Body::from(bytes))
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).expect("body should be JSON")
}

/// Value of the `http_requests_total` sample for a label combination in an
/// exposition text, or zero when the sample is absent.
pub fn scraped_request_count(text: &str, method: &str, route: &str, status: &str) -> u64 {
    let prefix = format!(
        r#"http_requests_total{{method="{}",route="{}",status_code="{}"}} "#,
        method, route, status
    );
    text.lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|value| value.trim().parse().expect("sample should be numeric"))
        .unwrap_or(0)
}
