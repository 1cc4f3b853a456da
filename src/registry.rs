//! Monitored resources and their collectors

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::ResourceId;
use crate::collector::MetricsCollector;

/// A registered resource: its collector plus a lock held for the whole of
/// one collection, cache write included
///
/// Holding the lock keeps two rounds from interleaving on the same resource,
/// so cached snapshots are written in the order their timestamps were issued.
pub struct MonitoredResource {
    collector: Arc<dyn MetricsCollector>,
    collection: Mutex<()>,
}

impl MonitoredResource {
    fn new(collector: Arc<dyn MetricsCollector>) -> Self {
        Self {
            collector,
            collection: Mutex::new(()),
        }
    }

    pub fn collector(&self) -> &Arc<dyn MetricsCollector> {
        &self.collector
    }

    /// Wait for any collection already running for this resource
    pub async fn begin_collection(&self) -> MutexGuard<'_, ()> {
        self.collection.lock().await
    }
}

/// Map from resource to collector behind a single read/write lock
///
/// Readers take a copy of the entries and release the lock before doing any
/// I/O with them.
#[derive(Default)]
pub struct Registry {
    resources: RwLock<HashMap<ResourceId, Arc<MonitoredResource>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector; `false` if the resource was already registered
    pub async fn insert(&self, id: ResourceId, collector: Arc<dyn MetricsCollector>) -> bool {
        let mut resources = self.resources.write().await;
        if resources.contains_key(&id) {
            return false;
        }
        resources.insert(id, Arc::new(MonitoredResource::new(collector)));
        true
    }

    /// `true` if the resource was registered
    pub async fn remove(&self, id: ResourceId) -> bool {
        self.resources.write().await.remove(&id).is_some()
    }

    pub async fn get(&self, id: ResourceId) -> Option<Arc<dyn MetricsCollector>> {
        self.resources
            .read()
            .await
            .get(&id)
            .map(|resource| Arc::clone(&resource.collector))
    }

    pub async fn contains(&self, id: ResourceId) -> bool {
        self.resources.read().await.contains_key(&id)
    }

    /// Copy of every entry, ordered by resource id
    pub async fn snapshot(&self) -> Vec<(ResourceId, Arc<MonitoredResource>)> {
        let mut entries: Vec<_> = self
            .resources
            .read()
            .await
            .iter()
            .map(|(id, resource)| (*id, Arc::clone(resource)))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    pub async fn ids(&self) -> Vec<ResourceId> {
        let mut ids: Vec<_> = self.resources.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
