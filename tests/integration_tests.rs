// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use common::minimal_snapshot;
use hostwatch::diagnostics::{DiagnosticConfig, DiagnosticExecutor};
use hostwatch::models::{StreamMessage, TelemetrySnapshot};
use hostwatch::ratelimit::Limit;
use hostwatch::routes;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::broadcast;

struct TestApp {
    router: axum::Router,
    tx: broadcast::Sender<StreamMessage>,
    latest: Arc<RwLock<Option<TelemetrySnapshot>>>,
}

fn test_app_with(config: DiagnosticConfig) -> TestApp {
    let (tx, _) = broadcast::channel(16);
    let latest = Arc::new(RwLock::new(None));
    let router = routes::app(
        tx.clone(),
        latest.clone(),
        Arc::new(DiagnosticExecutor::new(config)),
        Arc::new(AtomicUsize::new(0)),
    );
    TestApp { router, tx, latest }
}

fn test_app() -> TestApp {
    test_app_with(DiagnosticConfig::default())
}

/// Build TestServer with http_transport (required for WebSocket tests).
fn test_server_with_http() -> (TestServer, TestApp) {
    let app = test_app();
    let server = TestServer::builder()
        .http_transport()
        .build(app.router.clone())
        .unwrap();
    (server, app)
}

#[tokio::test]
async fn test_root_endpoint() {
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("hostwatch: host diagnostic and telemetry service");
}

#[tokio::test]
async fn test_version_endpoint() {
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("hostwatch"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_latest_endpoint_404_before_first_tick() {
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server.get("/api/latest").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
    let json: serde_json::Value = response.json();
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_latest_endpoint_serves_cached_snapshot() {
    let app = test_app();
    *app.latest.write() = Some(minimal_snapshot(42));
    let server = TestServer::new(app.router).unwrap();
    let response = server.get("/api/latest").await;
    response.assert_status_ok();
    let snapshot: TelemetrySnapshot = response.json();
    assert_eq!(snapshot.timestamp, 42);
}

#[tokio::test]
async fn test_diagnostics_rejects_invalid_host() {
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server
        .post("/diagnostics")
        .json(&serde_json::json!({ "host": "example.com; id", "command": "ping" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json();
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_diagnostics_rejects_tls_inspect_operation() {
    // TLS inspection has its own endpoint with domain validation.
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server
        .post("/diagnostics")
        .json(&serde_json::json!({ "host": "example.com", "command": "tls-inspect" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_diagnostics_traceroute_stub_is_well_formed() {
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server
        .post("/diagnostics")
        .json(&serde_json::json!({ "host": "example.com", "command": "traceroute" }))
        .await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("succeeded").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        json.get("operation").and_then(|v| v.as_str()),
        Some("traceroute")
    );
    assert_eq!(
        json.get("error").and_then(|v| v.as_str()),
        Some("not implemented")
    );
}

#[tokio::test]
async fn test_commands_rejects_unknown_key() {
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server
        .post("/commands")
        .json(&serde_json::json!({ "command": "rm -rf /" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json();
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_tls_check_rejects_invalid_domain() {
    let app = test_app();
    let server = TestServer::new(app.router).unwrap();
    let response = server
        .post("/tls-check")
        .json(&serde_json::json!({ "domain": "not a domain" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_diagnostics_returns_429_when_rate_limited() {
    let mut config = DiagnosticConfig::default();
    config.global_limit = Limit {
        max_requests: 1,
        window: Duration::from_secs(60),
    };
    let app = test_app_with(config);
    let server = TestServer::new(app.router).unwrap();

    // Traceroute is admitted by the limiter but runs nothing.
    let body = serde_json::json!({ "host": "example.com", "command": "traceroute" });
    let response = server.post("/diagnostics").json(&body).await;
    response.assert_status_ok();

    let response = server.post("/diagnostics").json(&body).await;
    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    let json: serde_json::Value = response.json();
    assert!(json.get("error").is_some());
}

// --- WebSocket tests (require http_transport) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_telemetry_serves_cached_snapshot_first() {
    let (server, app) = test_server_with_http();
    *app.latest.write() = Some(minimal_snapshot(7));
    let mut ws = server
        .get_websocket("/ws/telemetry")
        .await
        .into_websocket()
        .await;
    let message: StreamMessage = receive_first_json_text(&mut ws).await;
    match message {
        StreamMessage::Snapshot(s) => assert_eq!(s.timestamp, 7),
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ws_telemetry_receives_broadcast_snapshot() {
    let (server, app) = test_server_with_http();
    let mut ws = server
        .get_websocket("/ws/telemetry")
        .await
        .into_websocket()
        .await;
    let tx = app.tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        let _ = tx.send(StreamMessage::Snapshot(minimal_snapshot(43)));
    });
    let message: StreamMessage = receive_first_json_text(&mut ws).await;
    match message {
        StreamMessage::Snapshot(s) => assert_eq!(s.timestamp, 43),
        other => panic!("expected snapshot, got {other:?}"),
    }
}
