//! Typed, namespaced access to a [`CacheStore`]

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::backend::CacheStore;
use super::error::CacheResult;

/// Wraps a store, prefixing every key with a namespace and encoding values as JSON
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
    namespace: String,
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_string(value)?;
        self.store.set(&self.build_key(key), data, ttl).await
    }

    /// `Ok(None)` when the key is absent or expired
    pub async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.store.get(&self.build_key(key)).await? {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, keys: &[&str]) -> CacheResult<usize> {
        let keys: Vec<String> = keys.iter().map(|key| self.build_key(key)).collect();
        self.store.delete(&keys).await
    }

    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.store.exists(&self.build_key(key)).await
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        self.store.expire(&self.build_key(key), ttl).await
    }

    pub async fn increment(&self, key: &str) -> CacheResult<i64> {
        self.increment_by(key, 1).await
    }

    pub async fn increment_by(&self, key: &str, value: i64) -> CacheResult<i64> {
        self.store.increment_by(&self.build_key(key), value).await
    }

    pub async fn decrement(&self, key: &str) -> CacheResult<i64> {
        self.increment_by(key, -1).await
    }

    pub async fn decrement_by(&self, key: &str, value: i64) -> CacheResult<i64> {
        self.increment_by(key, value.saturating_neg()).await
    }

    pub async fn add_to_set<M: ToString>(&self, key: &str, members: &[M]) -> CacheResult<()> {
        let members: Vec<String> = members.iter().map(ToString::to_string).collect();
        self.store.add_to_set(&self.build_key(key), &members).await
    }

    pub async fn remove_from_set<M: ToString>(&self, key: &str, members: &[M]) -> CacheResult<()> {
        let members: Vec<String> = members.iter().map(ToString::to_string).collect();
        self.store.remove_from_set(&self.build_key(key), &members).await
    }

    pub async fn is_set_member(&self, key: &str, member: impl ToString) -> CacheResult<bool> {
        self.store
            .is_set_member(&self.build_key(key), &member.to_string())
            .await
    }

    pub async fn set_members(&self, key: &str) -> CacheResult<Vec<String>> {
        self.store.set_members(&self.build_key(key)).await
    }
}
