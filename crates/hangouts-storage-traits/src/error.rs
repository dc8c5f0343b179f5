//! Error types for hangouts cache operations

use thiserror::Error;

/// Error type for cache storage operations.
///
/// Every backend maps its native failures onto these variants so that the
/// reconciler and dispatcher can handle storage uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Nothing has ever been written under the key
    #[error("cache miss: {0}")]
    CacheMiss(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl StorageError {
    /// Whether this error only reports an uninitialized key.
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss(_))
    }
}
