// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::diagnostics::DiagnosticExecutor;
use crate::models::{StreamMessage, TelemetrySnapshot};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) stream_tx: broadcast::Sender<StreamMessage>,
    pub(crate) latest: Arc<RwLock<Option<TelemetrySnapshot>>>,
    pub(crate) executor: Arc<DiagnosticExecutor>,
    pub(crate) subscriber_count: Arc<AtomicUsize>,
}

pub fn app(
    stream_tx: broadcast::Sender<StreamMessage>,
    latest: Arc<RwLock<Option<TelemetrySnapshot>>>,
    executor: Arc<DiagnosticExecutor>,
    subscriber_count: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        stream_tx,
        latest,
        executor,
        subscriber_count,
    };
    Router::new()
        .route("/", get(|| async { "hostwatch: host diagnostic and telemetry service" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/latest", get(http::latest_handler)) // GET /api/latest
        .route("/diagnostics", post(http::diagnostics_handler)) // POST /diagnostics
        .route("/commands", post(http::commands_handler)) // POST /commands
        .route("/tls-check", post(http::tls_check_handler)) // POST /tls-check
        .route("/ws/telemetry", get(ws::ws_telemetry)) // WS /ws/telemetry
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
