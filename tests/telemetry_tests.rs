// Telemetry probe tests against the real host

use hostwatch::telemetry::{Collector, TelemetryProbe};

#[tokio::test]
async fn test_collect_returns_plausible_snapshot() {
    let probe = TelemetryProbe::new();
    let snapshot = probe.collect().await;

    assert!(snapshot.timestamp > 0);
    assert!(snapshot.memory.total_bytes > 0);
    assert!(snapshot.memory.used_bytes <= snapshot.memory.total_bytes);
    assert!((0.0..=100.0).contains(&snapshot.cpu.usage_percent));
    assert!((0.0..=100.0).contains(&snapshot.memory.usage_percent));
    assert!((0.0..=100.0).contains(&snapshot.disk.usage_percent));
    for partition in &snapshot.disk.partitions {
        assert!(partition.used_bytes <= partition.total_bytes);
    }
}

#[tokio::test]
async fn test_collect_never_panics_on_repeat() {
    // Second collection exercises the network delta path.
    let probe = TelemetryProbe::new();
    let first = probe.collect().await;
    let second = probe.collect().await;
    assert!(second.timestamp >= first.timestamp);
}
