//! Exclusive lock file so only one WalletCache process works on a vault.
//!
//! The lock is advisory (`flock`/`LockFileEx` via `fs2`) and is released
//! when the [`VaultLock`] is dropped or the process exits.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::errors::{StorageError, WalletCacheError, Result};

/// Suffix of the lock file next to the canonical vault file.
const LOCK_SUFFIX: &str = ".lock";

/// Holds the exclusive lock for a vault file.
#[derive(Debug)]
pub struct VaultLock {
    path: PathBuf,
    _file: File,
}

impl VaultLock {
    /// Take the lock for the vault at `vault_path` without blocking.
    ///
    /// Fails with `VaultLocked` if another process holds it.
    pub fn acquire(vault_path: &Path) -> Result<Self> {
        let mut name = OsString::from(vault_path.as_os_str());
        name.push(LOCK_SUFFIX);
        let path = PathBuf::from(name);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        if file.try_lock_exclusive().is_err() {
            return Err(WalletCacheError::VaultLocked(path));
        }

        debug!(path = %path.display(), "vault lock acquired");
        Ok(Self { path, _file: file })
    }

    /// Returns the path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
