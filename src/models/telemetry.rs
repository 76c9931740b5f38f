// Telemetry snapshot models: one immutable reading per collection tick

use serde::{Deserialize, Serialize};

/// Usage percent from used/total, clamped to [0, 100].
/// The only way percent fields are produced; they are never set independently.
pub fn derive_usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuTelemetry {
    pub usage_percent: f64,
    pub per_core_load: Vec<f64>,
    pub temperature_celsius: Option<f32>,
}

impl CpuTelemetry {
    /// Placeholder section when the CPU probe fails for a tick.
    pub fn unknown() -> Self {
        Self {
            usage_percent: 0.0,
            per_core_load: vec![],
            temperature_celsius: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryTelemetry {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub cached_bytes: u64,
    pub buffers_bytes: u64,
    pub usage_percent: f64,
}

impl MemoryTelemetry {
    pub fn new(total: u64, used: u64, free: u64, cached: u64, buffers: u64) -> Self {
        Self {
            total_bytes: total,
            used_bytes: used,
            free_bytes: free,
            cached_bytes: cached,
            buffers_bytes: buffers,
            usage_percent: derive_usage_percent(used, total),
        }
    }

    pub fn unknown() -> Self {
        Self::new(0, 0, 0, 0, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionTelemetry {
    pub mount: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskTelemetry {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub usage_percent: f64,
    pub partitions: Vec<PartitionTelemetry>,
}

impl DiskTelemetry {
    /// Aggregate totals over the partition list; percent is derived.
    pub fn from_partitions(partitions: Vec<PartitionTelemetry>) -> Self {
        let total: u64 = partitions.iter().map(|p| p.total_bytes).sum();
        let used: u64 = partitions.iter().map(|p| p.used_bytes).sum();
        let free: u64 = partitions.iter().map(|p| p.free_bytes).sum();
        Self {
            total_bytes: total,
            used_bytes: used,
            free_bytes: free,
            usage_percent: derive_usage_percent(used, total),
            partitions,
        }
    }

    pub fn unknown() -> Self {
        Self::from_partitions(vec![])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTelemetry {
    pub bytes_in_per_sec: u64,
    pub bytes_out_per_sec: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub errors: u64,
    pub dropped: u64,
}

impl NetworkTelemetry {
    pub fn unknown() -> Self {
        Self {
            bytes_in_per_sec: 0,
            bytes_out_per_sec: 0,
            packets_in: 0,
            packets_out: 0,
            errors: 0,
            dropped: 0,
        }
    }
}

/// One immutable host telemetry reading. Produced by the collector each tick
/// and overwritten into the broadcaster's single "latest" slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub timestamp: u64,
    pub cpu: CpuTelemetry,
    pub memory: MemoryTelemetry,
    pub disk: DiskTelemetry,
    pub network: NetworkTelemetry,
}
