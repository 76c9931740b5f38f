// Model serialization tests (JSON camelCase, tagged unions, alert edges)

mod common;

use common::{minimal_snapshot, snapshot_with_usage};
use hostwatch::models::*;

#[test]
fn test_cpu_telemetry_serialization_camel_case() {
    let cpu = CpuTelemetry {
        usage_percent: 12.5,
        per_core_load: vec![10.0, 15.0],
        temperature_celsius: Some(45.0),
    };
    let json = serde_json::to_string(&cpu).unwrap();
    assert!(json.contains("\"usagePercent\""));
    assert!(json.contains("\"perCoreLoad\""));
    assert!(json.contains("\"temperatureCelsius\""));
    let back: CpuTelemetry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cpu);
}

#[test]
fn test_derive_usage_percent_clamps() {
    assert_eq!(derive_usage_percent(50, 100), 50.0);
    assert_eq!(derive_usage_percent(0, 0), 0.0);
    assert_eq!(derive_usage_percent(200, 100), 100.0);
}

#[test]
fn test_memory_telemetry_percent_is_derived() {
    let memory = MemoryTelemetry::new(1000, 250, 750, 0, 0);
    assert_eq!(memory.usage_percent, 25.0);
    let empty = MemoryTelemetry::new(0, 0, 0, 0, 0);
    assert_eq!(empty.usage_percent, 0.0);
}

#[test]
fn test_disk_telemetry_aggregates_partitions() {
    let disk = DiskTelemetry::from_partitions(vec![
        PartitionTelemetry {
            mount: "/".into(),
            total_bytes: 100,
            used_bytes: 60,
            free_bytes: 40,
        },
        PartitionTelemetry {
            mount: "/data".into(),
            total_bytes: 100,
            used_bytes: 20,
            free_bytes: 80,
        },
    ]);
    assert_eq!(disk.total_bytes, 200);
    assert_eq!(disk.used_bytes, 80);
    assert_eq!(disk.usage_percent, 40.0);
}

#[test]
fn test_snapshot_json_roundtrip_field_for_field() {
    let mut snapshot = minimal_snapshot(12345);
    snapshot.cpu = CpuTelemetry {
        usage_percent: 42.5,
        per_core_load: vec![40.0, 45.0],
        temperature_celsius: Some(55.5),
    };
    snapshot.memory = MemoryTelemetry::new(16_000_000_000, 8_000_000_000, 7_000_000_000, 500, 100);
    snapshot.network.bytes_in_per_sec = 1024;
    snapshot.network.dropped = 3;
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn test_diagnostic_op_wire_names() {
    assert_eq!(
        serde_json::to_string(&DiagnosticOp::PortScan).unwrap(),
        "\"port-scan\""
    );
    assert_eq!(
        serde_json::to_string(&DiagnosticOp::TlsInspect).unwrap(),
        "\"tls-inspect\""
    );
    let op: DiagnosticOp = serde_json::from_str("\"shell-command\"").unwrap();
    assert_eq!(op, DiagnosticOp::ShellCommand);
}

#[test]
fn test_diagnostic_result_ping_tagged_serialization() {
    let result = DiagnosticResult::ok(DiagnosticOutcome::Ping {
        alive: true,
        round_trip_ms: Some(10.4),
        ttl: Some(57),
        output: String::new(),
    });
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"operation\":\"ping\""));
    assert!(json.contains("\"roundTripMs\""));
    assert!(json.contains("\"succeeded\":true"));
    let back: DiagnosticResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn test_diagnostic_result_tls_tagged_serialization() {
    let result = DiagnosticResult::ok(DiagnosticOutcome::TlsInspect {
        domain: "example.com".into(),
        valid_from: "2025-01-01T00:00:00+00:00".into(),
        valid_to: "2026-01-01T00:00:00+00:00".into(),
        issuer: "Test CA".into(),
        subject: "example.com".into(),
        serial_number: "01:02:03".into(),
        protocol: "TLSv1.3".into(),
        cipher: "TLS13_AES_256_GCM_SHA384".into(),
        grade: "A+".into(),
    });
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"operation\":\"tls-inspect\""));
    assert!(json.contains("\"serialNumber\""));
    let back: DiagnosticResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn test_stream_message_envelope_roundtrip() {
    let message = StreamMessage::Snapshot(minimal_snapshot(42));
    let json = message.to_json().unwrap();
    assert!(json.contains("\"type\":\"snapshot\""));
    let back = StreamMessage::from_json(&json).unwrap();
    assert_eq!(back, message);
}

#[test]
fn test_stream_message_alert_envelope() {
    let message = StreamMessage::Alert(Alert {
        title: "High CPU Usage".into(),
        message: "CPU usage is at 95.0%".into(),
        level: AlertLevel::Warning,
        metric: "cpu".into(),
        value: 95.0,
        timestamp: 42,
    });
    let json = message.to_json().unwrap();
    assert!(json.contains("\"type\":\"alert\""));
    assert!(json.contains("\"level\":\"warning\""));
    let back = StreamMessage::from_json(&json).unwrap();
    assert_eq!(back, message);
}

#[test]
fn test_stream_message_rejects_unknown_shape() {
    assert!(StreamMessage::from_json("{\"type\":\"bogus\"}").is_err());
    assert!(StreamMessage::from_json("{\"timestamp\":1}").is_err());
    assert!(StreamMessage::from_json("not json").is_err());
}

#[test]
fn test_alert_state_fires_on_rising_edge_only() {
    let thresholds = AlertThresholds::default();
    let mut state = AlertState::new();

    let hot = snapshot_with_usage(1, 95.0, 10, 10);
    let alerts = state.evaluate(&hot, &thresholds);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "High CPU Usage");
    assert_eq!(alerts[0].level, AlertLevel::Warning);

    // Still hot: no repeat while above threshold.
    let alerts = state.evaluate(&snapshot_with_usage(2, 95.0, 10, 10), &thresholds);
    assert!(alerts.is_empty());

    // Cooled down, then hot again: re-armed.
    let alerts = state.evaluate(&snapshot_with_usage(3, 50.0, 10, 10), &thresholds);
    assert!(alerts.is_empty());
    let alerts = state.evaluate(&snapshot_with_usage(4, 95.0, 10, 10), &thresholds);
    assert_eq!(alerts.len(), 1);
}

#[test]
fn test_alert_state_disk_is_critical() {
    let thresholds = AlertThresholds::default();
    let mut state = AlertState::new();
    let alerts = state.evaluate(&snapshot_with_usage(1, 10.0, 10, 95), &thresholds);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Low Disk Space");
    assert_eq!(alerts[0].level, AlertLevel::Critical);
}

#[test]
fn test_alert_state_multiple_metrics_in_one_tick() {
    let thresholds = AlertThresholds::default();
    let mut state = AlertState::new();
    let alerts = state.evaluate(&snapshot_with_usage(1, 95.0, 90, 95), &thresholds);
    assert_eq!(alerts.len(), 3);
}
