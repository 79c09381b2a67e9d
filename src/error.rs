//! Error types for the cache repositories
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache backend.
///
/// A missing key is never an error: lookups report absence through `Option`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Redis transport or protocol failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Memcached transport or protocol failure
    #[error("Memcache error: {0}")]
    Memcache(#[from] memcache::MemcacheError),

    /// The backend has no primitive for the requested operation
    #[error("Operation not supported by this backend: {0}")]
    Unsupported(String),

    /// Malformed glob pattern passed to a key search
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal failure, such as a blocking worker that panicked
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true when the error signals a capability gap rather than a fault.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CacheError::Unsupported(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        CacheError::Internal(format!("blocking task failed: {}", err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
