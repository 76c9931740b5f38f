// Tagged wire envelope for the telemetry stream

use serde::{Deserialize, Serialize};

use super::{Alert, TelemetrySnapshot};

/// One message on the subscriber stream. Tagged so clients can tell the
/// periodic snapshot apart from one-shot alerts without guessing at shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamMessage {
    Snapshot(TelemetrySnapshot),
    Alert(Alert),
}

impl StreamMessage {
    /// Validating parse: fails closed on unknown tags or malformed bodies.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
