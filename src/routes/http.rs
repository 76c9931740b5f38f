// HTTP handlers: version, latest snapshot, diagnostic POST endpoints

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, extract::State};
use serde::Deserialize;

use super::AppState;
use crate::error::DiagnosticError;
use crate::models::{DiagnosticOp, DiagnosticRequest, DiagnosticResult};
use crate::version::{NAME, VERSION};

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/latest — last cached snapshot, 404 before the first tick.
pub(super) async fn latest_handler(State(state): State<AppState>) -> Response {
    match state.latest.read().clone() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no telemetry collected yet" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct DiagnosticsBody {
    host: String,
    command: DiagnosticOp,
    #[serde(default)]
    ports: Option<Vec<u16>>,
}

/// POST /diagnostics — network probes (ping, dns, traceroute, port-scan).
pub(super) async fn diagnostics_handler(
    State(state): State<AppState>,
    Json(body): Json<DiagnosticsBody>,
) -> Result<Json<DiagnosticResult>, DiagnosticError> {
    if matches!(
        body.command,
        DiagnosticOp::TlsInspect | DiagnosticOp::ShellCommand
    ) {
        return Err(DiagnosticError::InvalidInput(format!(
            "'{}' is not served by this endpoint",
            body.command.as_str()
        )));
    }
    let request = DiagnosticRequest {
        operation: body.command,
        target: body.host,
        ports: body.ports,
    };
    execute(&state, request).await
}

#[derive(Debug, Deserialize)]
pub(super) struct CommandsBody {
    command: String,
}

/// POST /commands — fixed allow-listed command execution.
pub(super) async fn commands_handler(
    State(state): State<AppState>,
    Json(body): Json<CommandsBody>,
) -> Result<Json<DiagnosticResult>, DiagnosticError> {
    let request = DiagnosticRequest {
        operation: DiagnosticOp::ShellCommand,
        target: body.command,
        ports: None,
    };
    execute(&state, request).await
}

#[derive(Debug, Deserialize)]
pub(super) struct TlsCheckBody {
    domain: String,
}

/// POST /tls-check — TLS certificate inspection of domain:443.
pub(super) async fn tls_check_handler(
    State(state): State<AppState>,
    Json(body): Json<TlsCheckBody>,
) -> Result<Json<DiagnosticResult>, DiagnosticError> {
    let request = DiagnosticRequest {
        operation: DiagnosticOp::TlsInspect,
        target: body.domain,
        ports: None,
    };
    execute(&state, request).await
}

async fn execute(
    state: &AppState,
    request: DiagnosticRequest,
) -> Result<Json<DiagnosticResult>, DiagnosticError> {
    let result = state.executor.execute(&request).await.inspect_err(|e| {
        tracing::warn!(
            error = %e,
            operation = request.operation.as_str(),
            target = %request.target,
            "diagnostic failed"
        );
    })?;
    Ok(Json(result))
}
