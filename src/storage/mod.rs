//! Storage module — crash-consistent persistence of the vault file.
//!
//! This module provides:
//! - The transactional single-file store with staging, commit and
//!   recovery (`vault_file`)
//! - An exclusive lock file for single-instance access (`lock`)

pub mod lock;
pub mod vault_file;

pub use lock::VaultLock;
pub use vault_file::{
    CanonicalReader, CommitOutcome, DurableWrite, FileKind, FsOps, RecoveryReport, StagingWriter,
    StdFs, VaultFile, BACKUP_SUFFIX, STAGING_SUFFIX,
};
