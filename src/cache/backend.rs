//! Cache store trait definition
//!
//! This module defines the `CacheStore` trait that every cache
//! implementation must provide.

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;

/// Trait for key-value stores with per-key time-to-live
///
/// Keys passed in are already fully namespaced. A `ttl` of `None` means the
/// entry never expires. Expired entries behave exactly like absent ones.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` and safe to call concurrently from
/// many tasks; callers apply no locking of their own.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store a string value, replacing whatever was stored under `key`
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()>;

    /// Fetch a string value, `None` if absent or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> CacheResult<usize>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Reset the time-to-live of an existing key, `false` if it does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Atomically add `delta` to the counter under `key` (missing counts as 0)
    async fn increment_by(&self, key: &str, delta: i64) -> CacheResult<i64>;

    async fn add_to_set(&self, key: &str, members: &[String]) -> CacheResult<()>;

    async fn remove_from_set(&self, key: &str, members: &[String]) -> CacheResult<()>;

    async fn is_set_member(&self, key: &str, member: &str) -> CacheResult<bool>;

    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>>;
}
