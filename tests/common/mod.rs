// Shared test helpers

use hostwatch::models::*;

pub fn minimal_snapshot(timestamp: u64) -> TelemetrySnapshot {
    TelemetrySnapshot {
        timestamp,
        cpu: CpuTelemetry {
            usage_percent: 0.0,
            per_core_load: vec![],
            temperature_celsius: None,
        },
        memory: MemoryTelemetry::new(0, 0, 0, 0, 0),
        disk: DiskTelemetry::from_partitions(vec![]),
        network: NetworkTelemetry {
            bytes_in_per_sec: 0,
            bytes_out_per_sec: 0,
            packets_in: 0,
            packets_out: 0,
            errors: 0,
            dropped: 0,
        },
    }
}

/// Snapshot with chosen usage levels, for alert threshold tests.
#[allow(dead_code)]
pub fn snapshot_with_usage(
    timestamp: u64,
    cpu_percent: f64,
    memory_used: u64,
    disk_used: u64,
) -> TelemetrySnapshot {
    let mut snapshot = minimal_snapshot(timestamp);
    snapshot.cpu.usage_percent = cpu_percent;
    snapshot.memory = MemoryTelemetry::new(100, memory_used, 100 - memory_used, 0, 0);
    snapshot.disk = DiskTelemetry::from_partitions(vec![PartitionTelemetry {
        mount: "/".into(),
        total_bytes: 100,
        used_bytes: disk_used,
        free_bytes: 100 - disk_used,
    }]);
    snapshot
}
