//! Metrics collection for a single resource
//!
//! A [`MetricsCollector`] produces a complete [`SystemSnapshot`] or fails as a
//! whole; partial snapshots are never returned. [`SystemCollector`] samples
//! the local host, running each metric family on the blocking pool
//! concurrently:
//!
//! ```text
//! collect_system_metrics ─┬─ cpu (sampling window) ─┐
//!                         ├─ memory                 │
//!                         ├─ disk                   ├─ join ─→ SystemSnapshot
//!                         ├─ network                │
//!                         ├─ load                   │
//!                         └─ system info ───────────┘
//! ```
//!
//! The collector performs no retries; the periodic round is the retry.

pub mod procfs;
pub mod process;
pub mod service;
pub mod system;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::spawn_blocking;
use tracing::{instrument, trace};

use crate::{ProcessSnapshot, ResourceId, ServiceRunState, SystemSnapshot};

/// Produces snapshots and on-demand views for one resource
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    fn resource_id(&self) -> ResourceId;

    /// Sample every metric family; fails if any one of them fails
    async fn collect_system_metrics(&self) -> Result<SystemSnapshot>;

    /// Up to `limit` processes; processes vanishing mid-listing are skipped
    async fn collect_process_metrics(&self, limit: usize) -> Result<Vec<ProcessSnapshot>>;

    /// Run state of a named OS service
    async fn check_service_status(&self, name: &str) -> Result<ServiceRunState>;
}

/// Builds the collector for a newly registered resource
pub type CollectorFactory = Arc<dyn Fn(ResourceId) -> Arc<dyn MetricsCollector> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct CollectorConfig {
    /// Interval between the two CPU readings
    pub sample_window: Duration,
}

impl CollectorConfig {
    pub fn new(sample_window: Duration) -> Self {
        Self {
            sample_window: sample_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Collector sampling the host the process runs on
#[derive(Debug)]
pub struct SystemCollector {
    id: ResourceId,
    config: CollectorConfig,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl SystemCollector {
    pub fn new(id: ResourceId, config: CollectorConfig) -> Self {
        Self {
            id,
            config,
            last_timestamp: Mutex::new(None),
        }
    }

    /// Factory building a [`SystemCollector`] per resource
    pub fn factory(config: CollectorConfig) -> CollectorFactory {
        Arc::new(move |id| Arc::new(SystemCollector::new(id, config)) as Arc<dyn MetricsCollector>)
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let timestamp = monotonic_timestamp(*last, Utc::now());
        *last = Some(timestamp);
        timestamp
    }
}

/// Never earlier than the previously issued timestamp
pub fn monotonic_timestamp(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    last.map_or(now, |last| last.max(now))
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f).await.context("sampling task panicked")?
}

async fn collect_cpu(window: Duration) -> Result<crate::CpuMetrics> {
    let sampler = blocking(system::CpuSampler::start).await?;
    tokio::time::sleep(window).await;
    blocking(move || sampler.finish()).await
}

#[async_trait]
impl MetricsCollector for SystemCollector {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    #[instrument(skip(self), fields(resource = %self.id))]
    async fn collect_system_metrics(&self) -> Result<SystemSnapshot> {
        let timestamp = self.next_timestamp();

        let (cpu, memory, disk, network, load, info) = tokio::join!(
            collect_cpu(self.config.sample_window),
            blocking(system::sample_memory),
            blocking(system::sample_disks),
            blocking(system::sample_network),
            blocking(system::sample_load),
            blocking(system::sample_system_info),
        );

        let cpu = cpu.context("failed to collect cpu metrics")?;
        let memory = memory.context("failed to collect memory metrics")?;
        let disk = disk.context("failed to collect disk metrics")?;
        let network = network.context("failed to collect network metrics")?;
        let load = load.context("failed to collect load metrics")?;
        let (processes, uptime) = info.context("failed to collect system info")?;

        trace!(
            "sampled cpu {:.1}%, memory {:.1}%, {} partitions",
            cpu.usage,
            memory.usage,
            disk.partitions.len()
        );

        Ok(SystemSnapshot {
            server_id: self.id,
            timestamp,
            cpu,
            memory,
            disk,
            network,
            load,
            processes,
            uptime,
        })
    }

    #[instrument(skip(self), fields(resource = %self.id))]
    async fn collect_process_metrics(&self, limit: usize) -> Result<Vec<ProcessSnapshot>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let system = spawn_blocking(process::start_sample)
            .await
            .context("failed to collect process metrics")?;
        tokio::time::sleep(self.config.sample_window).await;
        spawn_blocking(move || process::finish_sample(system, limit))
            .await
            .context("failed to collect process metrics")
    }

    #[instrument(skip(self), fields(resource = %self.id))]
    async fn check_service_status(&self, name: &str) -> Result<ServiceRunState> {
        service::query(name)
            .await
            .with_context(|| format!("failed to check service {name}"))
    }
}
