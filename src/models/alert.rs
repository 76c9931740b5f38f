// Threshold alerts derived from telemetry snapshots

use serde::{Deserialize, Serialize};

use super::TelemetrySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// One-shot notification emitted alongside the telemetry stream when a
/// metric crosses its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub level: AlertLevel,
    pub metric: String,
    pub value: f64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 90.0,
            memory_percent: 85.0,
            disk_percent: 90.0,
        }
    }
}

/// Tracks which metrics are currently above threshold so each crossing
/// emits exactly one alert: fired on the rising edge, re-armed once the
/// metric falls back under.
#[derive(Debug, Default)]
pub struct AlertState {
    cpu_high: bool,
    memory_high: bool,
    disk_high: bool,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(
        &mut self,
        snapshot: &TelemetrySnapshot,
        thresholds: &AlertThresholds,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let cpu = snapshot.cpu.usage_percent;
        if cpu > thresholds.cpu_percent {
            if !self.cpu_high {
                self.cpu_high = true;
                alerts.push(Alert {
                    title: "High CPU Usage".into(),
                    message: format!("CPU usage is at {:.1}%", cpu),
                    level: AlertLevel::Warning,
                    metric: "cpu".into(),
                    value: cpu,
                    timestamp: snapshot.timestamp,
                });
            }
        } else {
            self.cpu_high = false;
        }

        let memory = snapshot.memory.usage_percent;
        if memory > thresholds.memory_percent {
            if !self.memory_high {
                self.memory_high = true;
                alerts.push(Alert {
                    title: "High Memory Usage".into(),
                    message: format!("Memory usage is at {:.1}%", memory),
                    level: AlertLevel::Warning,
                    metric: "memory".into(),
                    value: memory,
                    timestamp: snapshot.timestamp,
                });
            }
        } else {
            self.memory_high = false;
        }

        let disk = snapshot.disk.usage_percent;
        if disk > thresholds.disk_percent {
            if !self.disk_high {
                self.disk_high = true;
                alerts.push(Alert {
                    title: "Low Disk Space".into(),
                    message: format!("Disk usage is at {:.1}%", disk),
                    level: AlertLevel::Critical,
                    metric: "disk".into(),
                    value: disk,
                    timestamp: snapshot.timestamp,
                });
            }
        } else {
            self.disk_high = false;
        }

        alerts
    }
}
