// Wire and domain models

mod alert;
mod diagnostics;
mod stream;
mod telemetry;

pub use alert::{Alert, AlertLevel, AlertState, AlertThresholds};
pub use diagnostics::{DiagnosticOp, DiagnosticOutcome, DiagnosticRequest, DiagnosticResult};
pub use stream::StreamMessage;
pub use telemetry::{
    CpuTelemetry, DiskTelemetry, MemoryTelemetry, NetworkTelemetry, PartitionTelemetry,
    TelemetrySnapshot, derive_usage_percent,
};
