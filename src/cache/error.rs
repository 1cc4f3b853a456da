//! Error types for cache operations

use thiserror::Error;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// Value could not be encoded or decoded
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation does not match the kind of value stored under the key
    #[error("wrong kind of value stored under key {0}")]
    WrongType(String),
}
