//! Hangouts storage - domain types and the cache abstraction shared by every
//! storage backend of the hangouts sync engine.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod error;
pub mod hangouts;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::StorageError;
pub use hangouts::PeerRepository;
pub use hangouts::types::{Command, Hangout, HangoutState, Message, StateRole};

/// Backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Memory
    Memory,
    /// SQLite
    SQLite,
}

impl Backend {
    /// Check if it's a persistent backend
    ///
    /// All values different from [`Backend::Memory`] are considered persistent
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// Key/value cache with get-and-replace semantics.
///
/// Values are opaque strings; [`PeerRepository`] is implemented for every
/// `CacheStore` and owns the encoding. Implementations must be safe to share
/// between the app actor and its background tasks.
pub trait CacheStore: Send + Sync {
    /// Returns the backend type.
    fn backend(&self) -> Backend;

    /// Value stored under `key`, or `None` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    fn put(&self, key: &str, value: String) -> Result<(), StorageError>;
}
