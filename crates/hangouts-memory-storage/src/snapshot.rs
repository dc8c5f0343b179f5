//! Snapshot and rollback support for memory storage.
//!
//! A snapshot is a full copy of the cache taken under one read lock, so it
//! never observes a half-applied write. Tests use snapshots to assert that a
//! rejected operation left the cache untouched.

use std::collections::HashMap;

/// Point-in-time copy of every cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStorageSnapshot {
    entries: HashMap<String, String>,
}

impl MemoryStorageSnapshot {
    pub(crate) fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub(crate) fn into_entries(self) -> HashMap<String, String> {
        self.entries
    }

    /// Raw value stored under `key` when the snapshot was taken
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of keys captured
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
