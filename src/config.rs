use serde::Deserialize;
use std::time::Duration;

use crate::diagnostics::DiagnosticConfig;
use crate::models::AlertThresholds;
use crate::ratelimit::Limit;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub reconnect: ReconnectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub sample_interval_ms: u64,
    /// How often to log app stats (subscribers, snapshots published) at INFO level.
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of stream messages kept in the broadcast channel (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Hard bound on every diagnostic operation.
    pub timeout_secs: u64,
    pub ping_probes: u32,
    /// Network-probe cap across all targets.
    pub global_max_requests: u32,
    pub global_window_secs: u64,
    /// Network-probe cap per individual target.
    pub target_max_requests: u32,
    pub target_window_secs: u64,
    /// Fixed-command cap, its own scope.
    pub command_max_requests: u32,
    pub command_window_secs: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            ping_probes: 4,
            global_max_requests: 30,
            global_window_secs: 60,
            target_max_requests: 5,
            target_window_secs: 60,
            command_max_requests: 20,
            command_window_secs: 60,
        }
    }
}

impl DiagnosticsConfig {
    pub fn to_executor_config(&self) -> DiagnosticConfig {
        DiagnosticConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            ping_probes: self.ping_probes,
            global_limit: Limit {
                max_requests: self.global_max_requests,
                window: Duration::from_secs(self.global_window_secs),
            },
            target_limit: Limit {
                max_requests: self.target_max_requests,
                window: Duration::from_secs(self.target_window_secs),
            },
            command_limit: Limit {
                max_requests: self.command_max_requests,
                window: Duration::from_secs(self.command_window_secs),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cpu_percent: 90.0,
            memory_percent: 85.0,
            disk_percent: 90.0,
        }
    }
}

impl AlertsConfig {
    pub fn to_thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            cpu_percent: self.cpu_percent,
            memory_percent: self.memory_percent,
            disk_percent: self.disk_percent,
        }
    }
}

/// Subscriber-side reconnect tuning, consumed by embedding clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectionConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
    pub stale_after_secs: u64,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 10000,
            max_attempts: 10,
            stale_after_secs: 30,
        }
    }
}

impl ReconnectionConfig {
    pub fn to_client_config(&self) -> crate::client::ReconnectConfig {
        crate::client::ReconnectConfig {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
            stale_after: Duration::from_secs(self.stale_after_secs),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.diagnostics.timeout_secs > 0,
            "diagnostics.timeout_secs must be > 0, got {}",
            self.diagnostics.timeout_secs
        );
        anyhow::ensure!(
            self.diagnostics.ping_probes > 0,
            "diagnostics.ping_probes must be > 0, got {}",
            self.diagnostics.ping_probes
        );
        anyhow::ensure!(
            self.diagnostics.global_max_requests > 0,
            "diagnostics.global_max_requests must be > 0, got {}",
            self.diagnostics.global_max_requests
        );
        anyhow::ensure!(
            self.diagnostics.global_window_secs > 0,
            "diagnostics.global_window_secs must be > 0, got {}",
            self.diagnostics.global_window_secs
        );
        anyhow::ensure!(
            self.diagnostics.target_max_requests > 0,
            "diagnostics.target_max_requests must be > 0, got {}",
            self.diagnostics.target_max_requests
        );
        anyhow::ensure!(
            self.diagnostics.target_window_secs > 0,
            "diagnostics.target_window_secs must be > 0, got {}",
            self.diagnostics.target_window_secs
        );
        anyhow::ensure!(
            self.diagnostics.command_max_requests > 0,
            "diagnostics.command_max_requests must be > 0, got {}",
            self.diagnostics.command_max_requests
        );
        anyhow::ensure!(
            self.diagnostics.command_window_secs > 0,
            "diagnostics.command_window_secs must be > 0, got {}",
            self.diagnostics.command_window_secs
        );
        for (name, value) in [
            ("alerts.cpu_percent", self.alerts.cpu_percent),
            ("alerts.memory_percent", self.alerts.memory_percent),
            ("alerts.disk_percent", self.alerts.disk_percent),
        ] {
            anyhow::ensure!(
                value > 0.0 && value <= 100.0,
                "{} must be in (0, 100], got {}",
                name,
                value
            );
        }
        anyhow::ensure!(
            self.reconnect.base_delay_ms > 0,
            "reconnect.base_delay_ms must be > 0, got {}",
            self.reconnect.base_delay_ms
        );
        anyhow::ensure!(
            self.reconnect.max_delay_ms >= self.reconnect.base_delay_ms,
            "reconnect.max_delay_ms must be >= base_delay_ms, got {}",
            self.reconnect.max_delay_ms
        );
        anyhow::ensure!(
            self.reconnect.max_attempts > 0,
            "reconnect.max_attempts must be > 0, got {}",
            self.reconnect.max_attempts
        );
        anyhow::ensure!(
            self.reconnect.stale_after_secs > 0,
            "reconnect.stale_after_secs must be > 0, got {}",
            self.reconnect.stale_after_secs
        );
        Ok(())
    }
}
