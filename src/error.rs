//! Error types for the monitoring service

use thiserror::Error;

use crate::ResourceId;

/// Result type alias for service operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors surfaced by [`crate::service::MonitorService`]
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No fresh data for the resource: never collected, expired or evicted
    #[error("no data for resource {0}")]
    NotFound(ResourceId),

    /// The resource is not registered for monitoring
    #[error("resource {0} is not monitored")]
    NotMonitored(ResourceId),

    /// Malformed resource identifier, rejected before any collection
    #[error("invalid resource identifier: {0:?}")]
    InvalidResource(String),

    #[error("monitoring is already running")]
    AlreadyRunning,

    #[error("monitoring is not running")]
    NotRunning,

    /// Sampling the operating system failed
    #[error("collection failed for resource {id}: {source:#}")]
    Collection {
        id: ResourceId,
        #[source]
        source: anyhow::Error,
    },

    /// The resource directory could not be queried
    #[error("failed to list active resources: {0:#}")]
    Directory(anyhow::Error),

    #[error("{0} is not supported")]
    Unsupported(&'static str),
}
