//! File permission hardening for cache databases.
//!
//! The cache holds every relationship and conversation of a local user, so
//! the database directory is created owner-only (0700) and the file itself
//! 0600 on Unix. Other platforms rely on the host's app-private storage.

use std::fs::OpenOptions;
use std::io::ErrorKind;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::Error;

/// Whether a path names an SQLite special database rather than a file
pub(crate) fn is_special_path(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    path_str.is_empty() || path_str.starts_with(':')
}

/// Creates a directory (and parents) with owner-only access.
pub fn create_secure_directory<P>(path: P) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    std::fs::create_dir_all(path)?;

    #[cfg(unix)]
    set_mode(path, 0o700)?;

    Ok(())
}

/// Sets owner-only permissions on an existing file. Missing files are ignored.
pub fn set_secure_file_permissions<P>(path: P) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }

    #[cfg(unix)]
    set_mode(path, 0o600)?;

    Ok(())
}

/// Creates the database file with secure permissions before SQLite opens it,
/// so it never exists with umask-dependent permissions.
///
/// Returns `true` when this call created the file.
pub fn precreate_secure_database_file<P>(path: P) -> Result<bool, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if is_special_path(path) {
        return Ok(false);
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        create_secure_directory(parent)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_file) => {
            set_secure_file_permissions(path)?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), Error> {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        Error::FilePermission(format!(
            "Failed to set permissions {mode:o} on {:?}: {}",
            path, e
        ))
    })
}
