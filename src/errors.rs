use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which rename of the commit protocol failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameStep {
    /// Moving the previous canonical file aside to the backup path.
    CanonicalToBackup,
    /// Promoting the staging file to the canonical path.
    StagingToCanonical,
    /// Putting the backup back in place after a failed promotion.
    BackupToCanonical,
}

impl fmt::Display for RenameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::CanonicalToBackup => "canonical -> backup",
            Self::StagingToCanonical => "staging -> canonical",
            Self::BackupToCanonical => "backup -> canonical",
        };
        f.write_str(step)
    }
}

/// Errors raised by the transactional vault file.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("vault file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rename {step} failed: {source}")]
    RenameFailed {
        step: RenameStep,
        #[source]
        source: io::Error,
    },

    #[error(
        "save failed and the previous vault could not be restored: {source}. \
         The last good copy is kept at {}",
        .backup.display()
    )]
    CommitRestoreFailed {
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("an interrupted save left a backup at {} — run `walletcache recover` first", .0.display())]
    RecoveryRequired(PathBuf),
}

impl StorageError {
    /// Wrap an `io::Error` raised while touching `path`.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Like [`StorageError::io`], but a missing file is `NotFound`.
    ///
    /// Only reads of the canonical file use this; a missing staging
    /// directory or lock file is an `Io` failure.
    pub(crate) fn on_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// `true` only when the canonical file is gone and the backup must be
    /// restored by hand.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CommitRestoreFailed { .. })
    }
}

/// All errors that can occur in WalletCache.
#[derive(Debug, Error)]
pub enum WalletCacheError {
    // --- Storage errors ---
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Vault is in use by another WalletCache process ({0})")]
    VaultLocked(PathBuf),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Incorrect password or the vault file was modified")]
    IntegrityCheckFailed,

    #[error("HMAC error: {0}")]
    HmacError(String),

    #[error("Card #{0} not found")]
    CardNotFound(u32),

    #[error("{0}")]
    InvalidCard(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),
}

impl WalletCacheError {
    /// `true` for the one failure that must reach the user verbatim.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_fatal())
    }
}

/// Convenience type alias for WalletCache results.
pub type Result<T> = std::result::Result<T, WalletCacheError>;
