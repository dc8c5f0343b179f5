//! Memory-based storage implementation for the hangouts sync engine.
//!
//! This crate provides a memory-based [`CacheStore`]. It is non-persistent and
//! cleared when the process exits, which makes it the backend of choice for
//! tests and for sessions that opt out of persistence.
//!
//! ## Memory Exhaustion Protection
//!
//! Writes are validated against [`ValidationLimits`]:
//!
//! - [`DEFAULT_MAX_KEY_LENGTH`]: Maximum length of a cache key in bytes
//! - [`DEFAULT_MAX_VALUE_LENGTH`]: Maximum length of a stored value in bytes
//! - [`DEFAULT_MAX_ENTRIES`]: Maximum number of distinct keys
//!
//! ```rust
//! use hangouts_memory_storage::{HangoutsMemoryStorage, ValidationLimits};
//!
//! let limits = ValidationLimits::default().with_max_entries(64);
//! let storage = HangoutsMemoryStorage::with_limits(limits);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::HashMap;
use std::fmt;

use hangouts_storage_traits::{Backend, CacheStore, StorageError};
use parking_lot::RwLock;

mod snapshot;

pub use self::snapshot::MemoryStorageSnapshot;

/// Default maximum length of a cache key in bytes.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 512;

/// Default maximum length of a stored value in bytes.
pub const DEFAULT_MAX_VALUE_LENGTH: usize = 8 * 1024 * 1024;

/// Default maximum number of distinct keys.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Configurable validation limits for memory storage.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    /// Maximum length of a cache key in bytes
    pub max_key_length: usize,
    /// Maximum length of a stored value in bytes
    pub max_value_length: usize,
    /// Maximum number of distinct keys
    pub max_entries: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            max_value_length: DEFAULT_MAX_VALUE_LENGTH,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl ValidationLimits {
    /// Creates a new `ValidationLimits` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum key length in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0.
    pub fn with_max_key_length(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_key_length must be greater than 0");
        self.max_key_length = limit;
        self
    }

    /// Sets the maximum value length in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0.
    pub fn with_max_value_length(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_value_length must be greater than 0");
        self.max_value_length = limit;
        self
    }

    /// Sets the maximum number of distinct keys.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0.
    pub fn with_max_entries(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_entries must be greater than 0");
        self.max_entries = limit;
        self
    }
}

/// A memory-based [`CacheStore`].
///
/// All entries live in one map behind a `RwLock`: reads run concurrently,
/// writes are exclusive.
pub struct HangoutsMemoryStorage {
    limits: ValidationLimits,
    entries: RwLock<HashMap<String, String>>,
}

impl fmt::Debug for HangoutsMemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HangoutsMemoryStorage")
            .field("limits", &self.limits)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl Default for HangoutsMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl HangoutsMemoryStorage {
    /// Creates an empty storage with default limits.
    pub fn new() -> Self {
        Self::with_limits(ValidationLimits::default())
    }

    /// Creates an empty storage with the provided limits.
    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self {
            limits,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the active validation limits.
    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Captures every entry under a single read lock.
    pub fn create_snapshot(&self) -> MemoryStorageSnapshot {
        MemoryStorageSnapshot::new(self.entries.read().clone())
    }

    /// Replaces every entry with the snapshot's contents under a single write lock.
    pub fn restore_snapshot(&self, snapshot: MemoryStorageSnapshot) {
        *self.entries.write() = snapshot.into_entries();
    }

    fn validate(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key.len() > self.limits.max_key_length {
            return Err(StorageError::Database(format!(
                "key exceeds maximum length of {} bytes (got {} bytes)",
                self.limits.max_key_length,
                key.len()
            )));
        }
        if value.len() > self.limits.max_value_length {
            return Err(StorageError::Database(format!(
                "value for {key} exceeds maximum length of {} bytes (got {} bytes)",
                self.limits.max_value_length,
                value.len()
            )));
        }
        Ok(())
    }
}

impl CacheStore for HangoutsMemoryStorage {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.validate(key, &value)?;

        let mut entries = self.entries.write();
        if !entries.contains_key(key) && entries.len() >= self.limits.max_entries {
            return Err(StorageError::Database(format!(
                "cache is full ({} entries)",
                self.limits.max_entries
            )));
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
