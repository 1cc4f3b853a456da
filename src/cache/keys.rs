//! Cache key layout and time-to-live constants

use std::time::Duration;

use crate::ResourceId;
use crate::alerts::MetricType;

pub const PREFIX_METRICS: &str = "metrics";
pub const PREFIX_ALERT: &str = "alert";

/// Latest snapshot of a resource
pub const TTL_SERVER_METRICS: Duration = Duration::from_secs(5 * 60);
/// Aggregate online/offline statistics
pub const TTL_SYSTEM_STATS: Duration = Duration::from_secs(5 * 60);
/// Alert record for a (resource, metric) pair
pub const TTL_ALERT: Duration = Duration::from_secs(24 * 60 * 60);

/// Builds the keys owned by the monitoring service
///
/// Keys returned here are relative; [`super::CacheService`] adds the
/// namespace in front of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeys;

impl CacheKeys {
    pub fn new() -> Self {
        Self
    }

    pub fn server_metrics(&self, id: ResourceId) -> String {
        format!("{PREFIX_METRICS}:{id}")
    }

    pub fn system_stats(&self) -> String {
        String::from("system_stats")
    }

    pub fn alert(&self, id: ResourceId, metric: MetricType) -> String {
        format!("{PREFIX_ALERT}:{id}:{metric}")
    }
}
