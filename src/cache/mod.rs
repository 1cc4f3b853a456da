//! Key-value cache with per-key time-to-live
//!
//! The monitoring service treats the cache as the source of truth for the
//! latest snapshot of every resource. Entries disappear once their TTL
//! elapses, which is what turns a silent resource into an "offline" one.
//!
//! ## Layers
//!
//! - **`CacheStore`**: async trait over a raw string store (counters and
//!   string sets included). Implementations must be safe to share between
//!   tasks; no extra locking is applied on top of them.
//! - **`MemoryCache`**: in-process implementation, TTLs measured on the tokio
//!   clock.
//! - **`CacheService`**: typed wrapper that namespaces keys and stores values
//!   as JSON.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use fleet_monitor::cache::{CacheService, MemoryCache};
//!
//! # async fn example() -> fleet_monitor::cache::CacheResult<()> {
//! let cache = CacheService::new(Arc::new(MemoryCache::new()), "fleet");
//! cache.set("greeting", &"hello", Some(Duration::from_secs(60))).await?;
//! let value: Option<String> = cache.get("greeting").await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod keys;
pub mod memory;
pub mod service;

pub use backend::CacheStore;
pub use error::{CacheError, CacheResult};
pub use keys::CacheKeys;
pub use memory::MemoryCache;
pub use service::CacheService;
