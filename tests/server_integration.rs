mod common;

use std::sync::Arc;

use chrono::DateTime;
use common::test_config;
use greenroad::error::ServerError;
use greenroad::startup;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::oneshot;

#[tokio::test]
async fn serves_on_an_ephemeral_port() {
    let config = Arc::new(test_config());
    let listener = startup::bind(&config).await.expect("bind should succeed");
    let address = listener.local_addr().unwrap();
    let state = startup::build_state(config, address.port()).expect("state should build");
    assert_eq!(state.process.port(), address.port());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(startup::serve(listener, state, async move {
        let _ = shutdown_rx.await;
    }));

    let base = format!("http://{}", address);
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime"].is_number());
    assert!(DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());

    let response = client
        .get(format!("{base}/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.unwrap();
    assert!(text.contains(r#"http_requests_total{method="GET",route="/health""#));
    assert!(text.contains(r#"route="/does-not-exist",status_code="404""#));

    drop(client);
    shutdown_tx.send(()).unwrap();
    server
        .await
        .expect("server task should not panic")
        .expect("server should shut down cleanly");
}

#[tokio::test]
async fn binding_a_taken_port_fails() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = test_config();
    config.port = taken.local_addr().unwrap().port();

    match startup::bind(&config).await {
        Err(ServerError::Bind { address, .. }) => {
            assert_eq!(address, config.bind_address());
        }
        other => panic!("expected bind error, got {:?}", other.map(|_| ())),
    }
}
