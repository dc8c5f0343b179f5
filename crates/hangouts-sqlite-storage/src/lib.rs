//! SQLite-based storage implementation for the hangouts sync engine.
//!
//! This crate provides a persistent [`CacheStore`] backed by a single SQLite
//! table. The schema is applied with embedded `refinery` migrations the first
//! time a database is opened.
//!
//! ```no_run
//! use hangouts_sqlite_storage::HangoutsSqliteStorage;
//!
//! let storage = HangoutsSqliteStorage::open("/path/to/alice/hangouts.db")?;
//! # Ok::<(), hangouts_sqlite_storage::error::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use hangouts_storage_traits::{Backend, CacheStore, StorageError};
use rusqlite::{Connection, OptionalExtension, params};

pub mod error;
mod migrations;
mod permissions;

use self::error::Error;
use self::permissions::{is_special_path, precreate_secure_database_file, set_secure_file_permissions};

/// A SQLite-based [`CacheStore`].
///
/// One connection is shared behind a mutex; every `put` is a single
/// `INSERT ... ON CONFLICT` statement, so a reader never sees a partial value.
#[derive(Clone)]
pub struct HangoutsSqliteStorage {
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for HangoutsSqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HangoutsSqliteStorage").finish_non_exhaustive()
    }
}

impl HangoutsSqliteStorage {
    /// Opens (or creates) the database at `file_path` and applies migrations.
    ///
    /// Missing parent directories are created with owner-only permissions.
    pub fn open<P>(file_path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let file_path = file_path.as_ref();
        precreate_secure_database_file(file_path)?;

        let mut connection = Connection::open(file_path)?;
        migrations::run_migrations(&mut connection)?;

        if !is_special_path(file_path) {
            set_secure_file_permissions(file_path)?;
        }

        tracing::debug!(path = %file_path.display(), "opened hangouts cache");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Creates a non-persistent database, for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, Error> {
        let mut connection = Connection::open_in_memory()?;
        migrations::run_migrations(&mut connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Provides access to the underlying connection.
    pub(crate) fn with_connection<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .connection
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))?;
        f(&conn).map_err(|e| StorageError::from(Error::from(e)))
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl CacheStore for HangoutsSqliteStorage {
    fn backend(&self) -> Backend {
        Backend::SQLite
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
    }

    fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_millis()],
            )
            .map(|_| ())
        })
    }
}
