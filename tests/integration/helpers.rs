//! Helper collectors, caches and builders for integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use fleet_monitor::cache::{CacheError, CacheResult, CacheService, CacheStore, MemoryCache};
use fleet_monitor::collector::{CollectorFactory, MetricsCollector};
use fleet_monitor::config::MonitorConfig;
use fleet_monitor::directory::{ResourceDirectory, StaticDirectory};
use fleet_monitor::service::MonitorService;
use fleet_monitor::{
    CpuMetrics, DiskMetrics, LoadMetrics, MemoryMetrics, NetworkMetrics, PartitionMetrics,
    ProcessSnapshot, ResourceId, ServiceRunState, ServiceStatus, SystemSnapshot,
};

pub const NAMESPACE: &str = "fleet";

/// How every fake collector of a test behaves
#[derive(Clone, Default)]
pub struct FakeFleet {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    /// Resources whose collection fails
    pub failing: HashSet<u64>,
    /// Age in seconds of the snapshot timestamps produced
    pub age_secs: i64,
    /// Time spent in the first collection
    pub delay: Duration,
    /// How much shorter each following collection is than the one before
    pub delay_step: Duration,
    pub calls: Arc<AtomicUsize>,
    pub in_flight: Arc<AtomicUsize>,
    pub peak_in_flight: Arc<AtomicUsize>,
}

impl FakeFleet {
    pub fn with_cpu(cpu: f64) -> Self {
        Self {
            cpu,
            ..Default::default()
        }
    }

    pub fn failing(mut self, ids: &[u64]) -> Self {
        self.failing.extend(ids.iter().copied());
        self
    }

    pub fn factory(&self) -> CollectorFactory {
        let fleet = self.clone();
        Arc::new(move |id| {
            Arc::new(FakeCollector {
                id,
                fleet: fleet.clone(),
            }) as Arc<dyn MetricsCollector>
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

pub struct FakeCollector {
    id: ResourceId,
    fleet: FakeFleet,
}

#[async_trait]
impl MetricsCollector for FakeCollector {
    fn resource_id(&self) -> ResourceId {
        self.id
    }

    async fn collect_system_metrics(&self) -> anyhow::Result<SystemSnapshot> {
        let fleet = &self.fleet;
        let call = fleet.calls.fetch_add(1, Ordering::SeqCst) as u32;
        let delay = fleet.delay.saturating_sub(fleet.delay_step * call);
        // capture time is taken before sampling, like the host collector
        let timestamp = Utc::now() - TimeDelta::seconds(fleet.age_secs);

        let running = fleet.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        fleet.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        fleet.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fleet.failing.contains(&self.id.get()) {
            bail!("failed to collect cpu metrics");
        }

        let mut snapshot = create_test_snapshot(self.id, fleet.cpu, fleet.memory, fleet.disk);
        snapshot.timestamp = timestamp;
        Ok(snapshot)
    }

    async fn collect_process_metrics(&self, limit: usize) -> anyhow::Result<Vec<ProcessSnapshot>> {
        if self.fleet.failing.contains(&self.id.get()) {
            bail!("failed to refresh process table");
        }
        Ok((1..=3u32).take(limit).map(create_test_process).collect())
    }

    async fn check_service_status(&self, name: &str) -> anyhow::Result<ServiceRunState> {
        Ok(ServiceRunState {
            status: ServiceStatus::Running,
            enabled: true,
            pid: Some(4242),
            ..ServiceRunState::unknown(name)
        })
    }
}

/// Store that is never reachable
pub struct FailingCache;

fn unavailable<T>() -> CacheResult<T> {
    Err(CacheError::Unavailable(String::from("connection refused")))
}

#[async_trait]
impl CacheStore for FailingCache {
    async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> CacheResult<()> {
        unavailable()
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        unavailable()
    }

    async fn delete(&self, _keys: &[String]) -> CacheResult<usize> {
        unavailable()
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        unavailable()
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> CacheResult<bool> {
        unavailable()
    }

    async fn increment_by(&self, _key: &str, _delta: i64) -> CacheResult<i64> {
        unavailable()
    }

    async fn add_to_set(&self, _key: &str, _members: &[String]) -> CacheResult<()> {
        unavailable()
    }

    async fn remove_from_set(&self, _key: &str, _members: &[String]) -> CacheResult<()> {
        unavailable()
    }

    async fn is_set_member(&self, _key: &str, _member: &str) -> CacheResult<bool> {
        unavailable()
    }

    async fn set_members(&self, _key: &str) -> CacheResult<Vec<String>> {
        unavailable()
    }
}

/// Directory whose backing store is down
pub struct FailingDirectory;

#[async_trait]
impl ResourceDirectory for FailingDirectory {
    async fn list_active_resources(&self) -> anyhow::Result<Vec<ResourceId>> {
        bail!("directory unreachable")
    }
}

pub fn create_test_snapshot(id: ResourceId, cpu: f64, memory: f64, disk: f64) -> SystemSnapshot {
    SystemSnapshot {
        server_id: id,
        timestamp: Utc::now(),
        cpu: CpuMetrics {
            usage: cpu,
            user_mode: cpu,
            idle: 100.0 - cpu,
            cores: 4,
            ..Default::default()
        },
        memory: MemoryMetrics {
            total: 16_000_000_000,
            used: (16_000_000_000.0 * memory / 100.0) as u64,
            usage: memory,
            ..Default::default()
        },
        disk: DiskMetrics {
            partitions: vec![PartitionMetrics {
                device: String::from("/dev/sda1"),
                mountpoint: String::from("/"),
                filesystem: String::from("ext4"),
                total: 100_000_000_000,
                used: (100_000_000_000.0 * disk / 100.0) as u64,
                available: (100_000_000_000.0 * (100.0 - disk) / 100.0) as u64,
                usage: disk,
            }],
            io_stats: Default::default(),
        },
        network: NetworkMetrics::default(),
        load: LoadMetrics {
            load1: 0.5,
            load5: 0.4,
            load15: 0.3,
        },
        processes: 120,
        uptime: 86_400,
    }
}

pub fn create_test_process(pid: u32) -> ProcessSnapshot {
    ProcessSnapshot {
        pid,
        name: format!("proc-{pid}"),
        status: String::from("Sleeping"),
        cpu_percent: 1.5,
        memory_rss: 4_096_000,
        memory_vms: 8_192_000,
        memory_percent: 0.1,
        open_files: 4,
        threads: 1,
        create_time: 1_700_000_000,
    }
}

pub fn ids(raw: &[u64]) -> Vec<ResourceId> {
    raw.iter().copied().map(ResourceId).collect()
}

/// Service over an in-memory cache; `directory` seeds `start_monitoring`
pub fn create_test_service(
    fleet: &FakeFleet,
    config: MonitorConfig,
    directory: &[u64],
) -> (Arc<MemoryCache>, MonitorService) {
    let store = Arc::new(MemoryCache::new());
    let cache = CacheService::new(store.clone(), NAMESPACE);
    let service = MonitorService::with_collector_factory(
        cache,
        Arc::new(StaticDirectory::new(ids(directory))),
        config,
        fleet.factory(),
    );
    (store, service)
}

pub fn create_service_without_cache(fleet: &FakeFleet) -> MonitorService {
    let cache = CacheService::new(Arc::new(FailingCache), NAMESPACE);
    MonitorService::with_collector_factory(
        cache,
        Arc::new(StaticDirectory::default()),
        MonitorConfig::default(),
        fleet.factory(),
    )
}

pub async fn add_resources(service: &MonitorService, raw: &[u64]) {
    for id in ids(raw) {
        service.add_resource(id).await.unwrap();
    }
}
