pub mod actors;
pub mod alerts;
#[cfg(feature = "api")]
pub mod api;
pub mod cache;
pub mod collector;
pub mod config;
pub mod directory;
pub mod error;
pub mod monitors;
pub mod registry;
pub mod service;
pub mod util;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Opaque identifier of a monitored host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl ResourceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(MonitorError::InvalidResource(s.to_string())),
            Ok(id) => Ok(Self(id)),
        }
    }
}

/// Everything captured in one collection attempt for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub server_id: ResourceId,
    pub timestamp: DateTime<Utc>,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkMetrics,
    pub load: LoadMetrics,
    pub processes: usize,
    /// Seconds since boot
    pub uptime: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub usage: f64,
    pub user_mode: f64,
    pub system_mode: f64,
    pub idle: f64,
    pub iowait: f64,
    pub nice: f64,
    pub irq: f64,
    pub softirq: f64,
    pub cores: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub free: u64,
    pub usage: f64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub partitions: Vec<PartitionMetrics>,
    pub io_stats: DiskIoStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionMetrics {
    pub device: String,
    pub mountpoint: String,
    pub filesystem: String,
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub usage: f64,
}

/// Aggregate I/O counters summed over physical devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskIoStats {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ops: u64,
    pub write_ops: u64,
    /// Milliseconds spent reading
    pub read_time: u64,
    /// Milliseconds spent writing
    pub write_time: u64,
    /// Milliseconds spent doing I/O
    pub io_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub bytes_recv: u64,
    pub bytes_sent: u64,
    pub packets_recv: u64,
    pub packets_sent: u64,
    pub errors_recv: u64,
    pub errors_sent: u64,
    pub dropped_recv: u64,
    pub dropped_sent: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadMetrics {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Per-process record, produced on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub status: String,
    pub cpu_percent: f64,
    pub memory_rss: u64,
    pub memory_vms: u64,
    pub memory_percent: f64,
    pub open_files: usize,
    pub threads: usize,
    /// Seconds since the epoch
    pub create_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Stopped,
    Failed,
    Unknown,
}

/// Run state of a named OS service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRunState {
    pub name: String,
    pub status: ServiceStatus,
    pub enabled: bool,
    pub last_started: Option<DateTime<Utc>>,
    /// Seconds since `last_started`
    pub uptime: u64,
    pub pid: Option<u32>,
}

impl ServiceRunState {
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ServiceStatus::Unknown,
            enabled: false,
            last_started: None,
            uptime: 0,
            pid: None,
        }
    }
}

/// `part / total * 100`, clamped to [0, 100]. A zero (or non-finite) total yields 0.
pub fn percentage(part: f64, total: f64) -> f64 {
    if total <= 0.0 || !total.is_finite() {
        return 0.0;
    }
    clamp_percent(part / total * 100.0)
}

/// Clamp a percentage reported by the OS into [0, 100]; NaN becomes 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}
