// Diagnostic request/result models: tagged union over operation kind

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticOp {
    Ping,
    Dns,
    Traceroute,
    PortScan,
    TlsInspect,
    ShellCommand,
}

impl DiagnosticOp {
    /// Wire name, used for rate-limit keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticOp::Ping => "ping",
            DiagnosticOp::Dns => "dns",
            DiagnosticOp::Traceroute => "traceroute",
            DiagnosticOp::PortScan => "port-scan",
            DiagnosticOp::TlsInspect => "tls-inspect",
            DiagnosticOp::ShellCommand => "shell-command",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRequest {
    pub operation: DiagnosticOp,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<u16>>,
}

/// Operation-specific result payload, tagged by `operation` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum DiagnosticOutcome {
    #[serde(rename_all = "camelCase")]
    Ping {
        alive: bool,
        round_trip_ms: Option<f64>,
        ttl: Option<u32>,
        output: String,
    },
    #[serde(rename_all = "camelCase")]
    Dns { address: String, family: String },
    #[serde(rename_all = "camelCase")]
    Traceroute { message: String },
    #[serde(rename_all = "camelCase")]
    PortScan { message: String },
    #[serde(rename_all = "camelCase")]
    TlsInspect {
        domain: String,
        valid_from: String,
        valid_to: String,
        issuer: String,
        subject: String,
        serial_number: String,
        protocol: String,
        cipher: String,
        grade: String,
    },
    #[serde(rename_all = "camelCase")]
    ShellCommand {
        command: String,
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResult {
    pub succeeded: bool,
    /// Empty when the operation succeeded.
    #[serde(default)]
    pub error: String,
    #[serde(flatten)]
    pub outcome: DiagnosticOutcome,
}

impl DiagnosticResult {
    pub fn ok(outcome: DiagnosticOutcome) -> Self {
        Self {
            succeeded: true,
            error: String::new(),
            outcome,
        }
    }

    pub fn failed(outcome: DiagnosticOutcome, error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error: error.into(),
            outcome,
        }
    }
}
