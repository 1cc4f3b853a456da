use std::net::SocketAddr;
use std::time::Duration;

use tracing::trace;

use crate::ResourceId;
use crate::alerts::{AlertRule, default_rules};
use crate::cache::keys::{TTL_ALERT, TTL_SERVER_METRICS, TTL_SYSTEM_STATS};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitorConfig {
    /// Seconds between collection rounds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Prefix in front of every cache key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Resources to monitor from the start
    #[serde(default)]
    pub resources: Vec<ResourceId>,

    /// Upper bound on collections running at once within a round
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_cpu_sample_window_ms")]
    pub cpu_sample_window_ms: u64,

    /// Seconds after which a snapshot no longer counts as online
    #[serde(default = "default_staleness")]
    pub staleness: u64,

    #[serde(default)]
    pub ttl: TtlConfig,

    /// Alert rules; the built-in thresholds when absent
    pub alerts: Option<Vec<AlertRule>>,

    #[serde(default)]
    pub api: ApiConfig,
}

/// Time-to-live of cache entries, in seconds
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct TtlConfig {
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot: u64,
    #[serde(default = "default_stats_ttl")]
    pub stats: u64,
    #[serde(default = "default_alert_ttl")]
    pub alert: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_interval() -> u64 {
    60
}

fn default_namespace() -> String {
    String::from("fleet")
}

fn default_max_concurrency() -> usize {
    16
}

fn default_cpu_sample_window_ms() -> u64 {
    1000
}

fn default_staleness() -> u64 {
    300
}

fn default_snapshot_ttl() -> u64 {
    TTL_SERVER_METRICS.as_secs()
}

fn default_stats_ttl() -> u64 {
    TTL_SYSTEM_STATS.as_secs()
}

fn default_alert_ttl() -> u64 {
    TTL_ALERT.as_secs()
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_enable_cors() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            namespace: default_namespace(),
            resources: Vec::new(),
            max_concurrency: default_max_concurrency(),
            cpu_sample_window_ms: default_cpu_sample_window_ms(),
            staleness: default_staleness(),
            ttl: TtlConfig::default(),
            alerts: None,
            api: ApiConfig::default(),
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot_ttl(),
            stats: default_stats_ttl(),
            alert: default_alert_ttl(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    pub fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_window_ms)
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    pub fn alert_rules(&self) -> Vec<AlertRule> {
        self.alerts.clone().unwrap_or_else(default_rules)
    }
}

impl TtlConfig {
    pub fn snapshot(&self) -> Duration {
        Duration::from_secs(self.snapshot)
    }

    pub fn stats(&self) -> Duration {
        Duration::from_secs(self.stats)
    }

    pub fn alert(&self) -> Duration {
        Duration::from_secs(self.alert)
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<MonitorConfig> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
