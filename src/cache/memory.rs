//! In-memory cache store
//!
//! Entries live in a map guarded by a read/write lock. Expiry is lazy: an
//! expired entry is treated as absent on every read and physically removed on
//! the next write to that key or by [`MemoryCache::purge_expired`].
//!
//! Deadlines are measured on `tokio::time::Instant`, so tests running on a
//! paused runtime can move past a TTL with `tokio::time::advance`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::backend::CacheStore;
use super::error::{CacheError, CacheResult};

#[derive(Debug, Clone)]
enum CacheValue {
    Text(String),
    Counter(i64),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: CacheValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// In-process implementation of [`CacheStore`]
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("purged {removed} expired cache entries");
        }
        removed
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|entry| entry.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn live<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
        entries.get(key).filter(|entry| entry.is_live(Instant::now()))
    }

    /// Fetch the live entry under `key` for mutation, dropping it first if expired
    fn live_mut<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        trace!("set {key} (ttl: {ttl:?})");
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry::new(CacheValue::Text(value), ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|entry| &entry.value) {
            None => Ok(None),
            Some(CacheValue::Text(value)) => Ok(Some(value.clone())),
            Some(CacheValue::Counter(value)) => Ok(Some(value.to_string())),
            Some(CacheValue::Set(_)) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let deleted = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| entry.is_live(now))
            .count();
        trace!("deleted {deleted} of {} keys", keys.len());
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let entries = self.entries.read().await;
        Ok(Self::live(&entries, key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut entries = self.entries.write().await;
        match Self::live_mut(&mut entries, key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut entries = self.entries.write().await;
        let Some(entry) = Self::live_mut(&mut entries, key) else {
            entries.insert(key.to_string(), Entry::new(CacheValue::Counter(delta), None));
            return Ok(delta);
        };

        let current = match &entry.value {
            CacheValue::Counter(value) => *value,
            CacheValue::Text(text) => text
                .parse::<i64>()
                .map_err(|_| CacheError::WrongType(key.to_string()))?,
            CacheValue::Set(_) => return Err(CacheError::WrongType(key.to_string())),
        };

        let next = current.saturating_add(delta);
        entry.value = CacheValue::Counter(next);
        Ok(next)
    }

    async fn add_to_set(&self, key: &str, members: &[String]) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        let Some(entry) = Self::live_mut(&mut entries, key) else {
            let set = members.iter().cloned().collect();
            entries.insert(key.to_string(), Entry::new(CacheValue::Set(set), None));
            return Ok(());
        };

        match &mut entry.value {
            CacheValue::Set(set) => {
                set.extend(members.iter().cloned());
                Ok(())
            }
            _ => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn remove_from_set(&self, key: &str, members: &[String]) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        let Some(entry) = Self::live_mut(&mut entries, key) else {
            return Ok(());
        };

        match &mut entry.value {
            CacheValue::Set(set) => {
                for member in members {
                    set.remove(member);
                }
                Ok(())
            }
            _ => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn is_set_member(&self, key: &str, member: &str) -> CacheResult<bool> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|entry| &entry.value) {
            None => Ok(false),
            Some(CacheValue::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>> {
        let entries = self.entries.read().await;
        match Self::live(&entries, key).map(|entry| &entry.value) {
            None => Ok(Vec::new()),
            Some(CacheValue::Set(set)) => {
                let mut members: Vec<String> = set.iter().cloned().collect();
                members.sort();
                Ok(members)
            }
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }
}
