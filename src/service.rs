//! MonitorService - Registry, periodic collection and cache-backed reads
//!
//! ## Message Flow
//!
//! ```text
//! tick → registry snapshot → JoinSet (≤ max_concurrency) ─┬─ collect → cache metrics:<id> → alerts
//!                                                         ├─ ...
//!                                                         └─ ...
//! reads → cache → SystemSnapshot / ServerStatus / SystemStats
//! ```
//!
//! A failing resource is logged and counted in the [`RoundSummary`]; it never
//! delays or aborts the other resources of the round.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::actors::scheduler::{MIN_INTERVAL, RoundRunner, SchedulerHandle};
use crate::alerts::{AlertEvaluator, AlertNotifier};
use crate::cache::{CacheKeys, CacheService};
use crate::collector::{CollectorConfig, CollectorFactory, MetricsCollector, SystemCollector};
use crate::config::MonitorConfig;
use crate::directory::ResourceDirectory;
use crate::error::{MonitorError, MonitorResult};
use crate::monitors::liveness::{ServerStatus, SystemStats};
use crate::registry::{MonitoredResource, Registry};
use crate::{ProcessSnapshot, ResourceId, ServiceRunState, SystemSnapshot};

pub use crate::actors::messages::RoundSummary;

/// Everything a collection round needs; cheap to clone into per-resource tasks
#[derive(Clone)]
struct MonitorCore {
    registry: Arc<Registry>,
    cache: CacheService,
    keys: CacheKeys,
    evaluator: Arc<AlertEvaluator>,
    notifier: AlertNotifier,
    config: Arc<MonitorConfig>,
    factory: CollectorFactory,
    directory: Arc<dyn ResourceDirectory>,
}

struct RunningScheduler {
    handle: SchedulerHandle,
    task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct MonitorService {
    core: Arc<MonitorCore>,
    scheduler: Arc<Mutex<Option<RunningScheduler>>>,
}

impl MonitorService {
    /// Service sampling the local host for every registered resource
    pub fn new(
        cache: CacheService,
        directory: Arc<dyn ResourceDirectory>,
        config: MonitorConfig,
    ) -> Self {
        let factory = SystemCollector::factory(CollectorConfig::new(config.cpu_sample_window()));
        Self::with_collector_factory(cache, directory, config, factory)
    }

    pub fn with_collector_factory(
        cache: CacheService,
        directory: Arc<dyn ResourceDirectory>,
        config: MonitorConfig,
        factory: CollectorFactory,
    ) -> Self {
        let core = MonitorCore {
            registry: Arc::new(Registry::new()),
            cache,
            keys: CacheKeys::new(),
            evaluator: Arc::new(AlertEvaluator::new(config.alert_rules())),
            notifier: AlertNotifier::new(),
            config: Arc::new(config),
            factory,
            directory,
        };

        Self {
            core: Arc::new(core),
            scheduler: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    /// Seed the registry from the directory and start ticking every `interval`
    ///
    /// Intervals shorter than [`MIN_INTERVAL`] are raised to it.
    #[instrument(skip(self))]
    pub async fn start_monitoring(&self, interval: Duration) -> MonitorResult<()> {
        let interval = interval.max(MIN_INTERVAL);
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let resources = self
            .core
            .directory
            .list_active_resources()
            .await
            .map_err(MonitorError::Directory)?;

        for id in &resources {
            self.core.register(*id).await?;
        }

        let (handle, task) = SchedulerHandle::spawn(Arc::clone(&self.core), interval);
        *scheduler = Some(RunningScheduler { handle, task });

        info!(
            "monitoring {} resources every {}s",
            resources.len(),
            interval.as_secs()
        );
        Ok(())
    }

    /// Stop the loop and wait until the in-flight round, if any, has finished
    #[instrument(skip(self))]
    pub async fn stop_monitoring(&self) -> MonitorResult<()> {
        let Some(RunningScheduler { handle, task }) = self.scheduler.lock().await.take() else {
            return Err(MonitorError::NotRunning);
        };

        if let Err(e) = handle.shutdown().await {
            warn!("scheduler already gone: {e:#}");
        }
        if let Err(e) = task.await {
            error!("scheduler task failed: {e}");
        }

        info!("monitoring stopped");
        Ok(())
    }

    pub async fn is_monitoring(&self) -> bool {
        self.scheduler.lock().await.is_some()
    }

    /// Ask the running scheduler for an immediate round
    pub async fn collect_now(&self) -> MonitorResult<RoundSummary> {
        let handle = self.running_handle().await?;
        handle
            .collect_now()
            .await
            .map_err(|_| MonitorError::NotRunning)
    }

    pub async fn update_interval(&self, interval_secs: u64) -> MonitorResult<()> {
        let handle = self.running_handle().await?;
        handle
            .update_interval(interval_secs)
            .await
            .map_err(|_| MonitorError::NotRunning)
    }

    async fn running_handle(&self) -> MonitorResult<SchedulerHandle> {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .map(|running| running.handle.clone())
            .ok_or(MonitorError::NotRunning)
    }

    /// Run one round directly, independent of the scheduler
    pub async fn collect_round(&self) -> RoundSummary {
        self.core.collect_round().await
    }

    /// Register a resource; registering it again is a no-op
    pub async fn add_resource(&self, id: ResourceId) -> MonitorResult<()> {
        self.core.register(id).await
    }

    /// Deregister a resource and evict its cached snapshot
    #[instrument(skip(self))]
    pub async fn remove_resource(&self, id: ResourceId) -> MonitorResult<()> {
        if self.core.registry.remove(id).await {
            info!("resource {id} removed from monitoring");
        }
        self.core.evict(id).await;
        Ok(())
    }

    pub async fn monitored_resources(&self) -> Vec<ResourceId> {
        self.core.registry.ids().await
    }

    /// Latest cached snapshot; `NotFound` when absent, expired or unreadable
    pub async fn get_server_metrics(&self, id: ResourceId) -> MonitorResult<SystemSnapshot> {
        match self.core.cached_snapshot(id).await {
            Some(snapshot) => Ok(snapshot),
            None => Err(MonitorError::NotFound(id)),
        }
    }

    /// `Online` while the cached snapshot is younger than the staleness threshold
    pub async fn get_server_status(&self, id: ResourceId) -> ServerStatus {
        self.core.status(id).await
    }

    /// Online/offline counts across the registry, cached for the stats TTL
    pub async fn get_system_stats(&self) -> SystemStats {
        let core = &self.core;
        let key = core.keys.system_stats();

        match core.cache.get::<SystemStats>(&key).await {
            Ok(Some(stats)) => return stats,
            Ok(None) => {}
            Err(e) => warn!("failed to read cached system stats: {e}"),
        }

        let ids = core.registry.ids().await;
        let statuses = join_all(ids.iter().map(|id| core.status(*id))).await;
        let stats = SystemStats::from_statuses(statuses, Utc::now());

        if let Err(e) = core.cache.set(&key, &stats, Some(core.config.ttl.stats())).await {
            warn!("failed to cache system stats: {e}");
        }

        stats
    }

    /// Up to `limit` processes of a registered resource, sampled now
    pub async fn get_process_metrics(
        &self,
        id: ResourceId,
        limit: usize,
    ) -> MonitorResult<Vec<ProcessSnapshot>> {
        let collector = self.core.collector(id).await?;
        collector
            .collect_process_metrics(limit)
            .await
            .map_err(|source| MonitorError::Collection { id, source })
    }

    pub async fn check_service_status(
        &self,
        id: ResourceId,
        name: &str,
    ) -> MonitorResult<ServiceRunState> {
        let collector = self.core.collector(id).await?;
        collector
            .check_service_status(name)
            .await
            .map_err(|source| MonitorError::Collection { id, source })
    }

    /// Only the latest snapshot is retained, so there is no history to serve
    pub async fn get_server_history(&self, _id: ResourceId) -> MonitorResult<Vec<SystemSnapshot>> {
        Err(MonitorError::Unsupported("metrics history"))
    }
}

impl MonitorCore {
    async fn register(&self, id: ResourceId) -> MonitorResult<()> {
        if id.get() == 0 {
            return Err(MonitorError::InvalidResource(id.to_string()));
        }

        if self.registry.insert(id, (self.factory)(id)).await {
            info!("resource {id} added to monitoring");
        } else {
            debug!("resource {id} is already monitored");
        }
        Ok(())
    }

    async fn collector(&self, id: ResourceId) -> MonitorResult<Arc<dyn MetricsCollector>> {
        self.registry
            .get(id)
            .await
            .ok_or(MonitorError::NotMonitored(id))
    }

    async fn evict(&self, id: ResourceId) {
        let key = self.keys.server_metrics(id);
        if let Err(e) = self.cache.delete(&[key.as_str()]).await {
            warn!("failed to evict snapshot of resource {id}: {e}");
        }
    }

    async fn cached_snapshot(&self, id: ResourceId) -> Option<SystemSnapshot> {
        match self.cache.get(&self.keys.server_metrics(id)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("failed to read snapshot of resource {id}: {e}");
                None
            }
        }
    }

    async fn status(&self, id: ResourceId) -> ServerStatus {
        let timestamp = self.cached_snapshot(id).await.map(|s| s.timestamp);
        ServerStatus::evaluate(timestamp, Utc::now(), self.config.staleness())
    }

    #[instrument(skip(self))]
    async fn collect_round(&self) -> RoundSummary {
        let started_at = Utc::now();
        let entries = self.registry.snapshot().await;
        let resources = entries.len();

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency()));
        let mut tasks = JoinSet::new();

        for (id, resource) in entries {
            let core = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (id, Err(MonitorError::NotRunning));
                };
                (id, core.collect_resource(id, &resource).await)
            });
        }

        let (mut succeeded, mut failed) = (0, 0);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => succeeded += 1,
                Ok((id, Err(e))) => {
                    error!("resource {id}: {e}");
                    failed += 1;
                }
                Err(e) => {
                    error!("collection task panicked: {e}");
                    failed += 1;
                }
            }
        }

        let summary = RoundSummary {
            resources,
            succeeded,
            failed,
            started_at,
            finished_at: Utc::now(),
        };

        debug!(
            "round finished: {succeeded}/{resources} succeeded, {failed} failed in {}ms",
            (summary.finished_at - summary.started_at).num_milliseconds()
        );
        summary
    }

    #[instrument(skip(self, resource))]
    async fn collect_resource(
        &self,
        id: ResourceId,
        resource: &MonitoredResource,
    ) -> MonitorResult<()> {
        // overlapping rounds take turns per resource, so writes follow timestamp order
        let _collecting = resource.begin_collection().await;

        let snapshot = resource
            .collector()
            .collect_system_metrics()
            .await
            .map_err(|source| MonitorError::Collection { id, source })?;

        let key = self.keys.server_metrics(id);
        if let Err(e) = self
            .cache
            .set(&key, &snapshot, Some(self.config.ttl.snapshot()))
            .await
        {
            warn!("failed to cache snapshot: {e}");
        }

        // removed while this collection was in flight
        if !self.registry.contains(id).await {
            trace!("resource {id} was removed during collection");
            self.evict(id).await;
            return Ok(());
        }

        self.check_alerts(&snapshot).await;
        Ok(())
    }

    async fn check_alerts(&self, snapshot: &SystemSnapshot) {
        for fired in self.evaluator.evaluate(snapshot) {
            let alert = fired.alert;
            let key = self.keys.alert(alert.server_id, alert.metric_type);

            warn!("alert: resource {}: {}", alert.server_id, alert.message);
            if let Err(e) = self
                .cache
                .set(&key, &alert, Some(self.config.ttl.alert()))
                .await
            {
                warn!("failed to cache alert: {e}");
            }

            if let Some(webhook) = &fired.notify {
                self.notifier.notify(webhook, &alert).await;
            }
        }
    }
}

#[async_trait]
impl RoundRunner for MonitorCore {
    async fn run_round(&self) -> RoundSummary {
        self.collect_round().await
    }
}
