// Typed failure taxonomy for the diagnostic request path.
// Validation and rate-limit failures short-circuit before any external call;
// every variant maps to a specific HTTP status in the routes layer.

use axum::http::StatusCode;

#[derive(Debug, Clone, thiserror::Error)]
pub enum DiagnosticError {
    /// Bad host/domain/command syntax. Never executed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Sliding-window cap hit. No timestamp was recorded; retry later.
    #[error("rate limit exceeded for {scope}: max {max} requests per {window_secs}s")]
    RateLimitExceeded {
        scope: String,
        max: u32,
        window_secs: u64,
    },

    /// Operation exceeded its hard bound. Resources are already freed.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Network, TLS, or process-spawn failure. Reported, not retried.
    #[error("connect error: {0}")]
    ConnectError(String),
}

impl DiagnosticError {
    /// HTTP status for the `{ "error": … }` response body.
    pub fn status(&self) -> StatusCode {
        match self {
            DiagnosticError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DiagnosticError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            DiagnosticError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DiagnosticError::ConnectError(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl axum::response::IntoResponse for DiagnosticError {
    fn into_response(self) -> axum::response::Response {
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
