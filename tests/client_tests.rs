// Reconnecting client tests: backoff schedule, terminal state, live stream

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::minimal_snapshot;
use hostwatch::broadcaster::{self, BroadcasterConfig, BroadcasterDeps};
use hostwatch::client::{ClientState, ReconnectConfig, ReconnectingClient, backoff_delay};
use hostwatch::diagnostics::{DiagnosticConfig, DiagnosticExecutor};
use hostwatch::models::{AlertThresholds, StreamMessage, TelemetrySnapshot};
use hostwatch::routes;
use hostwatch::telemetry::Collector;
use parking_lot::RwLock;
use tokio::sync::{broadcast, oneshot};
use tokio::time::timeout;

#[test]
fn test_backoff_delay_doubles_from_base() {
    let base = Duration::from_millis(100);
    let cap = Duration::from_secs(10);
    assert_eq!(backoff_delay(base, cap, 1), Duration::from_millis(100));
    assert_eq!(backoff_delay(base, cap, 2), Duration::from_millis(200));
    assert_eq!(backoff_delay(base, cap, 3), Duration::from_millis(400));
    assert_eq!(backoff_delay(base, cap, 4), Duration::from_millis(800));
}

#[test]
fn test_backoff_delay_caps() {
    let base = Duration::from_secs(1);
    let cap = Duration::from_secs(10);
    assert_eq!(backoff_delay(base, cap, 5), cap);
    // Large attempt numbers must not overflow.
    assert_eq!(backoff_delay(base, cap, 40), cap);
}

/// Binds a listener to grab an ephemeral port, then drops it so the port
/// refuses connections.
async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{port}/ws/telemetry")
}

#[tokio::test]
async fn test_exhausted_attempts_reach_terminal_connection_lost() {
    let url = refused_url().await;
    let config = ReconnectConfig {
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        max_attempts: 3,
        stale_after: Duration::from_secs(5),
    };
    let started = Instant::now();
    let client = ReconnectingClient::connect(url, config);

    let mut state_rx = client.watch_state();
    timeout(
        Duration::from_secs(5),
        state_rx.wait_for(|s| *s == ClientState::ConnectionLost),
    )
    .await
    .expect("client should give up")
    .expect("state channel should stay open");

    // Three failed attempts with 100ms/200ms/400ms pauses between the
    // first and the fourth (the one that trips the limit).
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(client.state(), ClientState::ConnectionLost);
    assert_eq!(client.latest(), None);

    // Terminal means no further attempts until asked.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(client.state(), ClientState::ConnectionLost);

    client.shutdown().await;
}

#[tokio::test]
async fn test_restart_leaves_terminal_state() {
    let url = refused_url().await;
    let config = ReconnectConfig {
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        max_attempts: 2,
        stale_after: Duration::from_secs(5),
    };
    let client = ReconnectingClient::connect(url, config);

    let mut state_rx = client.watch_state();
    timeout(
        Duration::from_secs(5),
        state_rx.wait_for(|s| *s == ClientState::ConnectionLost),
    )
    .await
    .unwrap()
    .unwrap();

    client.restart();
    // A fresh attempt cycle begins: the state moves off ConnectionLost.
    timeout(
        Duration::from_secs(5),
        state_rx.wait_for(|s| *s != ClientState::ConnectionLost),
    )
    .await
    .expect("restart should resume attempts")
    .unwrap();

    client.shutdown().await;
}

struct TickCollector {
    ticks: AtomicU64,
}

#[async_trait]
impl Collector for TickCollector {
    async fn collect(&self) -> TelemetrySnapshot {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        minimal_snapshot(n)
    }
}

/// Full loop: broadcaster worker behind the real WebSocket route, consumed
/// by the reconnecting client.
#[tokio::test]
async fn test_client_streams_from_live_server() {
    let (stream_tx, _keep) = broadcast::channel::<StreamMessage>(16);
    let latest = Arc::new(RwLock::new(None));
    let subscriber_count = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let worker = broadcaster::spawn(
        BroadcasterDeps {
            collector: Arc::new(TickCollector {
                ticks: AtomicU64::new(0),
            }),
            tx: stream_tx.clone(),
            latest: latest.clone(),
            subscriber_count: subscriber_count.clone(),
            shutdown_rx,
        },
        BroadcasterConfig {
            sample_interval_ms: 20,
            stats_log_interval_secs: 3600,
            thresholds: AlertThresholds::default(),
        },
    );

    let app = routes::app(
        stream_tx,
        latest,
        Arc::new(DiagnosticExecutor::new(DiagnosticConfig::default())),
        subscriber_count,
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ReconnectingClient::connect(
        format!("ws://127.0.0.1:{port}/ws/telemetry"),
        ReconnectConfig::default(),
    );

    let mut state_rx = client.watch_state();
    timeout(
        Duration::from_secs(5),
        state_rx.wait_for(|s| *s == ClientState::Connected),
    )
    .await
    .expect("client should connect")
    .unwrap();

    let mut snapshot_rx = client.watch_snapshots();
    timeout(
        Duration::from_secs(5),
        snapshot_rx.wait_for(|s| s.is_some()),
    )
    .await
    .expect("client should receive a snapshot")
    .unwrap();
    let first = client.latest().expect("latest should be cached");
    assert!(first.timestamp >= 1);

    // The stream keeps advancing.
    timeout(
        Duration::from_secs(5),
        snapshot_rx.wait_for(|s| s.as_ref().is_some_and(|snap| snap.timestamp > first.timestamp)),
    )
    .await
    .expect("stream should advance")
    .unwrap();

    client.shutdown().await;
    shutdown_tx.send(()).unwrap();
    timeout(Duration::from_secs(2), worker).await.unwrap().unwrap();
    server.abort();
}
