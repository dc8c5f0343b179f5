// Per-user cache selection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use hangouts_memory_storage::HangoutsMemoryStorage;
use hangouts_sqlite_storage::HangoutsSqliteStorage;
use hangouts_storage_traits::CacheStore;

use super::config::StorageKind;

const CACHE_FILE_NAME: &str = "hangouts.db";

/// `<data_dir>/users/<username>/hangouts.db`
pub fn cache_path(data_dir: &str, username: &str) -> anyhow::Result<PathBuf> {
    validate_username(username)?;
    Ok(Path::new(data_dir)
        .join("users")
        .join(username)
        .join(CACHE_FILE_NAME))
}

/// Opens the cache owned by `username`. Every local user gets their own store.
pub fn open_cache(
    data_dir: &str,
    username: &str,
    kind: StorageKind,
) -> anyhow::Result<Arc<dyn CacheStore>> {
    match kind {
        StorageKind::Memory => {
            validate_username(username)?;
            Ok(Arc::new(HangoutsMemoryStorage::default()))
        }
        StorageKind::Sqlite => {
            let path = cache_path(data_dir, username)?;
            let storage = HangoutsSqliteStorage::open(&path)
                .with_context(|| format!("open cache at {}", path.display()))?;
            Ok(Arc::new(storage))
        }
    }
}

fn validate_username(username: &str) -> anyhow::Result<()> {
    if username.trim().is_empty() {
        bail!("username must not be empty");
    }
    if username == "." || username == ".." || username.contains(['/', '\\', '\0']) {
        bail!("username {username:?} cannot name a cache directory");
    }
    Ok(())
}
