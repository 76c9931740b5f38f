// Host telemetry collection via sysinfo

mod linux;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sysinfo::{Components, Disks, Networks, System};
use tracing::instrument;

use crate::models::{
    CpuTelemetry, DiskTelemetry, MemoryTelemetry, NetworkTelemetry, PartitionTelemetry,
    TelemetrySnapshot,
};

/// Snapshot source, injected into the broadcaster so tests can substitute
/// a deterministic collector.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self) -> TelemetrySnapshot;
}

/// Cumulative interface counters from the previous refresh, for throughput
/// deltas.
#[derive(Debug, Clone, Copy)]
struct NetCounters {
    bytes_in: u64,
    bytes_out: u64,
}

pub struct TelemetryProbe {
    sys: Arc<std::sync::Mutex<System>>,
    disks: Arc<std::sync::Mutex<Disks>>,
    networks: Arc<std::sync::Mutex<Networks>>,
    components: Arc<std::sync::Mutex<Components>>,
    last_network: Arc<std::sync::Mutex<Option<(NetCounters, Instant)>>>,
}

impl Default for TelemetryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryProbe {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        let components = Components::new_with_refreshed_list();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            disks: Arc::new(std::sync::Mutex::new(disks)),
            networks: Arc::new(std::sync::Mutex::new(networks)),
            components: Arc::new(std::sync::Mutex::new(components)),
            last_network: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    #[instrument(skip(self), fields(probe = "telemetry", operation = "cpu_telemetry"))]
    pub async fn cpu_telemetry(&self) -> anyhow::Result<CpuTelemetry> {
        let sys = self.sys.clone();
        let components = self.components.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_cpu_all();

            let usage = (sys.global_cpu_usage() as f64).clamp(0.0, 100.0);
            let per_core: Vec<f64> = sys
                .cpus()
                .iter()
                .map(|c| (c.cpu_usage() as f64).clamp(0.0, 100.0))
                .collect();

            // Best effort; None when the host exposes no usable sensor.
            let temperature = components
                .lock()
                .ok()
                .and_then(|mut comps| {
                    comps.refresh(false);
                    comps
                        .iter()
                        .filter(|c| {
                            let label = c.label().to_ascii_lowercase();
                            label.contains("cpu")
                                || label.contains("core")
                                || label.contains("package")
                                || label.contains("tctl")
                        })
                        .filter_map(|c| c.temperature())
                        .fold(None, |max: Option<f32>, t| {
                            Some(max.map_or(t, |m| m.max(t)))
                        })
                })
                .or_else(linux::read_thermal_zone_temp);

            Ok(CpuTelemetry {
                usage_percent: usage,
                per_core_load: per_core,
                temperature_celsius: temperature,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(probe = "telemetry", operation = "memory_telemetry"))]
    pub async fn memory_telemetry(&self) -> anyhow::Result<MemoryTelemetry> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_memory();

            let total = sys.total_memory();
            let free = sys.free_memory();
            let used = total.saturating_sub(sys.available_memory());
            let (cached, buffers) = linux::read_meminfo_cached_buffers().unwrap_or((0, 0));

            Ok(MemoryTelemetry::new(total, used, free, cached, buffers))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(probe = "telemetry", operation = "disk_telemetry"))]
    pub async fn disk_telemetry(&self) -> anyhow::Result<DiskTelemetry> {
        let disks = self.disks.clone();
        tokio::task::spawn_blocking(move || {
            let mut disks = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks.refresh(false);
            let partitions: Vec<PartitionTelemetry> = disks
                .list()
                .iter()
                .map(|d| {
                    let total = d.total_space();
                    let free = d.available_space();
                    PartitionTelemetry {
                        mount: d.mount_point().to_string_lossy().into_owned(),
                        total_bytes: total,
                        used_bytes: total.saturating_sub(free),
                        free_bytes: free,
                    }
                })
                .collect();
            Ok(DiskTelemetry::from_partitions(partitions))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(probe = "telemetry", operation = "network_telemetry"))]
    pub async fn network_telemetry(&self) -> anyhow::Result<NetworkTelemetry> {
        let networks = self.networks.clone();
        let last_network = self.last_network.clone();
        tokio::task::spawn_blocking(move || {
            let mut networks = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks.refresh(true);

            let mut bytes_in: u64 = 0;
            let mut bytes_out: u64 = 0;
            let mut packets_in: u64 = 0;
            let mut packets_out: u64 = 0;
            let mut errors: u64 = 0;
            for (_, data) in networks.list() {
                bytes_in += data.total_received();
                bytes_out += data.total_transmitted();
                packets_in += data.total_packets_received();
                packets_out += data.total_packets_transmitted();
                errors += data.total_errors_on_received() + data.total_errors_on_transmitted();
            }
            let dropped = linux::read_net_dev_dropped().unwrap_or(0);

            // Throughput is a delta against the previous refresh.
            let now = Instant::now();
            let mut in_per_sec = 0;
            let mut out_per_sec = 0;
            if let Ok(mut guard) = last_network.lock() {
                if let Some((prev, prev_ts)) = *guard {
                    let dt_secs = now.duration_since(prev_ts).as_secs_f64();
                    if dt_secs > 0.0 {
                        in_per_sec =
                            (bytes_in.saturating_sub(prev.bytes_in) as f64 / dt_secs) as u64;
                        out_per_sec =
                            (bytes_out.saturating_sub(prev.bytes_out) as f64 / dt_secs) as u64;
                    }
                }
                *guard = Some((
                    NetCounters {
                        bytes_in,
                        bytes_out,
                    },
                    now,
                ));
            }

            Ok(NetworkTelemetry {
                bytes_in_per_sec: in_per_sec,
                bytes_out_per_sec: out_per_sec,
                packets_in,
                packets_out,
                errors,
                dropped,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

#[async_trait]
impl Collector for TelemetryProbe {
    /// One snapshot per tick. A failed sub-probe contributes an unknown
    /// section with a logged warning; the tick itself never fails.
    async fn collect(&self) -> TelemetrySnapshot {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
                0
            });

        let cpu = match self.cpu_telemetry().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, operation = "cpu_telemetry", "CPU probe failed");
                CpuTelemetry::unknown()
            }
        };
        let memory = match self.memory_telemetry().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, operation = "memory_telemetry", "memory probe failed");
                MemoryTelemetry::unknown()
            }
        };
        let disk = match self.disk_telemetry().await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, operation = "disk_telemetry", "disk probe failed");
                DiskTelemetry::unknown()
            }
        };
        let network = match self.network_telemetry().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, operation = "network_telemetry", "network probe failed");
                NetworkTelemetry::unknown()
            }
        };

        TelemetrySnapshot {
            timestamp,
            cpu,
            memory,
            disk,
            network,
        }
    }
}
