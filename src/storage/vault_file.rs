//! Transactional single-file store.
//!
//! A vault lives in one canonical file.  Every save writes a complete
//! replacement to a staging sibling (`<file>.tmp`), syncs it, and then
//! promotes it with same-directory renames, keeping the previous file as
//! a backup sibling (`<file>.bak`) until the promotion is durable:
//!
//! ```text
//! canonical -> backup      (rollback path)
//! staging   -> canonical   (promotion)
//! fsync(parent dir)
//! remove backup
//! ```
//!
//! The canonical file is never deleted before its replacement is in
//! place, so an interrupted save leaves either the old or the new payload
//! behind.  [`VaultFile::recover`] resolves any leftovers at startup.
//!
//! The payload is opaque bytes; encryption and framing belong to the
//! caller.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::errors::{RenameStep, StorageError};

/// Suffix of the staging sibling.
pub const STAGING_SUFFIX: &str = ".tmp";

/// Suffix of the backup sibling.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Chunk size used by the whole-payload helpers.
const CHUNK_LEN: usize = 64 * 1024;

type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Filesystem seam
// ---------------------------------------------------------------------------

/// A staging file handle: a byte sink that can be made durable.
pub trait DurableWrite: Write {
    /// Flush file contents to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

impl DurableWrite for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// The filesystem primitives the commit protocol depends on.
///
/// Production code uses [`StdFs`]; tests swap in implementations that
/// fail or "crash" at chosen steps.
pub trait FsOps {
    /// Create (or truncate) `path` for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn DurableWrite>> {
        Ok(Box::new(File::create(path)?))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Make directory entry changes (renames, removals) durable.
    fn sync_dir(&self, dir: &Path) -> io::Result<()>;
}

/// [`FsOps`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FsOps for StdFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    #[cfg(unix)]
    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        File::open(dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self, _dir: &Path) -> io::Result<()> {
        // NTFS journals metadata; there is no directory handle to sync.
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One of the three paths that make up a logical vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Canonical,
    Staging,
    Backup,
}

/// How a successful commit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The new payload is canonical and no leftovers remain.
    Committed,
    /// The new payload is canonical, but the backup of the previous one
    /// is still on disk.  It is removed by the next commit or by
    /// [`VaultFile::recover`].
    CommittedWithStaleBackup,
}

/// What [`VaultFile::recover`] had to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// The canonical file was missing and was restored from the backup.
    pub restored_from_backup: bool,
    /// A backup from a completed commit was removed.
    pub removed_stale_backup: bool,
    /// An uncommitted staging file was discarded.
    pub discarded_staging: bool,
}

impl RecoveryReport {
    /// `true` if nothing was left over from a previous run.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// A logical vault file: canonical path plus its staging and backup
/// siblings.
#[derive(Debug, Clone)]
pub struct VaultFile<F: FsOps = StdFs> {
    canonical: PathBuf,
    staging: PathBuf,
    backup: PathBuf,
    fs: F,
}

impl VaultFile<StdFs> {
    /// Derive the staging and backup paths from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fs(path, StdFs)
    }
}

impl<F: FsOps> VaultFile<F> {
    /// Like [`VaultFile::new`], with explicit filesystem primitives.
    pub fn with_fs(path: impl Into<PathBuf>, fs: F) -> Self {
        let canonical = path.into();
        let staging = with_suffix(&canonical, STAGING_SUFFIX);
        let backup = with_suffix(&canonical, BACKUP_SUFFIX);
        Self {
            canonical,
            staging,
            backup,
            fs,
        }
    }

    /// Returns the path for `kind`.
    pub fn path(&self, kind: FileKind) -> &Path {
        match kind {
            FileKind::Canonical => &self.canonical,
            FileKind::Staging => &self.staging,
            FileKind::Backup => &self.backup,
        }
    }

    // ------------------------------------------------------------------
    // Staging writer / canonical reader
    // ------------------------------------------------------------------

    /// Open (creating or truncating) the staging file for writing.
    ///
    /// The staging file only survives if the writer is
    /// [`close`](StagingWriter::close)d successfully; dropping it early
    /// removes the file, so [`commit`](Self::commit) can never promote a
    /// half-written payload.
    pub fn begin_staging_write(&self) -> StorageResult<StagingWriter> {
        let file = self
            .fs
            .create(&self.staging)
            .map_err(|e| StorageError::io(&self.staging, e))?;
        debug!(path = %self.staging.display(), "staging write started");
        Ok(StagingWriter {
            inner: BufWriter::new(file),
            path: self.staging.clone(),
            position: 0,
            closed: false,
        })
    }

    /// Open the canonical file for sequential reading.
    pub fn begin_canonical_read(&self) -> StorageResult<CanonicalReader> {
        let file =
            File::open(&self.canonical).map_err(|e| StorageError::on_read(&self.canonical, e))?;
        Ok(CanonicalReader {
            inner: BufReader::new(file),
            path: self.canonical.clone(),
            position: 0,
        })
    }

    /// Read the whole canonical payload.
    pub fn read_canonical(&self) -> StorageResult<Vec<u8>> {
        let mut reader = self.begin_canonical_read()?;
        let expected = usize::try_from(self.size_of(FileKind::Canonical)).unwrap_or(0);
        let mut payload = Vec::with_capacity(expected);
        loop {
            let chunk = reader.read(CHUNK_LEN)?;
            if chunk.is_empty() {
                break;
            }
            payload.extend_from_slice(&chunk);
        }
        debug!(bytes = reader.position(), "canonical payload read");
        Ok(payload)
    }

    /// Write `payload` as the complete staging file and sync it.
    ///
    /// On any failure the staging file is removed before the error is
    /// returned, so a partial payload can never be committed.
    pub fn write_staging(&self, payload: &[u8]) -> StorageResult<()> {
        let result = self.begin_staging_write().and_then(|mut writer| {
            for chunk in payload.chunks(CHUNK_LEN) {
                writer.write(chunk)?;
            }
            writer.close()
        });

        if let Err(e) = &result {
            warn!(error = %e, "staging write failed, discarding staging file");
            self.delete(FileKind::Staging);
        }
        result
    }

    // ------------------------------------------------------------------
    // Commit protocol
    // ------------------------------------------------------------------

    /// Promote the staging file to canonical.
    ///
    /// Every `Err` except [`StorageError::CommitRestoreFailed`] leaves the
    /// canonical file exactly as it was and removes the staging file.
    /// A missing staging file is reported as [`StorageError::NotFound`].
    pub fn commit(&self) -> StorageResult<CommitOutcome> {
        if !self.exists(FileKind::Staging) {
            return Err(StorageError::NotFound(self.staging.clone()));
        }

        if self.exists(FileKind::Backup) {
            if !self.exists(FileKind::Canonical) {
                // The backup is the only good copy; promoting now would orphan it.
                warn!(backup = %self.backup.display(), "canonical file missing, refusing commit");
                self.delete(FileKind::Staging);
                return Err(StorageError::RecoveryRequired(self.backup.clone()));
            }
            if let Err(e) = self.fs.remove_file(&self.backup) {
                warn!(error = %e, "removing stale backup failed");
                self.delete(FileKind::Staging);
                return Err(StorageError::io(&self.backup, e));
            }
            debug!("removed stale backup before commit");
        }

        if !self.exists(FileKind::Canonical) {
            if let Err(source) = self.fs.rename(&self.staging, &self.canonical) {
                warn!(error = %source, "promoting staging file failed");
                self.delete(FileKind::Staging);
                return Err(StorageError::RenameFailed {
                    step: RenameStep::StagingToCanonical,
                    source,
                });
            }
            if let Err(e) = self.fs.sync_dir(self.parent_dir()) {
                warn!(error = %e, "directory sync after first commit failed");
            }
            debug!(path = %self.canonical.display(), "committed first version");
            return Ok(CommitOutcome::Committed);
        }

        if let Err(source) = self.fs.rename(&self.canonical, &self.backup) {
            warn!(error = %source, "moving canonical file to backup failed");
            self.delete(FileKind::Staging);
            return Err(StorageError::RenameFailed {
                step: RenameStep::CanonicalToBackup,
                source,
            });
        }
        debug!("canonical file moved to backup");

        if let Err(source) = self.fs.rename(&self.staging, &self.canonical) {
            warn!(error = %source, "promoting staging file failed, restoring backup");
            if let Err(restore) = self.fs.rename(&self.backup, &self.canonical) {
                error!(
                    error = %restore,
                    backup = %self.backup.display(),
                    "restoring backup failed; last good copy left in place"
                );
                self.delete(FileKind::Staging);
                return Err(StorageError::CommitRestoreFailed {
                    backup: self.backup.clone(),
                    source: restore,
                });
            }
            self.delete(FileKind::Staging);
            return Err(StorageError::RenameFailed {
                step: RenameStep::StagingToCanonical,
                source,
            });
        }
        debug!("staging file promoted");

        // Keep the rollback path until the promotion is on disk.
        if let Err(e) = self.fs.sync_dir(self.parent_dir()) {
            warn!(error = %e, "directory sync failed, keeping backup");
            return Ok(CommitOutcome::CommittedWithStaleBackup);
        }

        if !self.delete(FileKind::Backup) {
            return Ok(CommitOutcome::CommittedWithStaleBackup);
        }

        debug!(path = %self.canonical.display(), "commit complete");
        Ok(CommitOutcome::Committed)
    }

    /// Resolve leftovers from an interrupted run.
    ///
    /// Call once at startup before trusting the canonical file.
    pub fn recover(&self) -> StorageResult<RecoveryReport> {
        let mut report = RecoveryReport::default();

        if self.exists(FileKind::Backup) {
            if self.exists(FileKind::Canonical) {
                // The promotion finished; only the cleanup was lost.
                report.removed_stale_backup = self.delete(FileKind::Backup);
            } else {
                self.fs
                    .rename(&self.backup, &self.canonical)
                    .map_err(|source| StorageError::RenameFailed {
                        step: RenameStep::BackupToCanonical,
                        source,
                    })?;
                if let Err(e) = self.fs.sync_dir(self.parent_dir()) {
                    warn!(error = %e, "directory sync after restore failed");
                }
                warn!(path = %self.canonical.display(), "restored vault from backup");
                report.restored_from_backup = true;
            }
        }

        if self.exists(FileKind::Staging) {
            report.discarded_staging = self.delete(FileKind::Staging);
            if report.discarded_staging {
                warn!(path = %self.staging.display(), "discarded uncommitted staging file");
            }
        }

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Query & cleanup surface
    // ------------------------------------------------------------------

    /// Returns `true` if the file for `kind` exists.
    pub fn exists(&self, kind: FileKind) -> bool {
        self.path(kind).exists()
    }

    /// Size in bytes of the file for `kind`, or 0 if it does not exist.
    pub fn size_of(&self, kind: FileKind) -> u64 {
        fs::metadata(self.path(kind)).map_or(0, |m| m.len())
    }

    /// Remove the file for `kind`.  Returns whether a file was removed.
    pub fn delete(&self, kind: FileKind) -> bool {
        let path = self.path(kind);
        match self.fs.remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not remove file");
                false
            }
        }
    }

    fn parent_dir(&self) -> &Path {
        match self.canonical.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

/// Sequential writer over the staging file.
///
/// Dropping it without a successful [`close`](Self::close) deletes the
/// staging file.
pub struct StagingWriter {
    inner: BufWriter<Box<dyn DurableWrite>>,
    path: PathBuf,
    position: u64,
    closed: bool,
}

impl StagingWriter {
    /// Append `bytes` to the staging file.
    pub fn write(&mut self, bytes: &[u8]) -> StorageResult<()> {
        self.inner
            .write_all(bytes)
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Flush buffered bytes and sync the file to stable storage.
    pub fn close(mut self) -> StorageResult<()> {
        self.inner
            .flush()
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.inner
            .get_mut()
            .sync()
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.closed = true;
        debug!(bytes = self.position, "staging file synced");
        Ok(())
    }
}

impl Drop for StagingWriter {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "unfinished staging file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "could not remove unfinished staging file"
            ),
        }
    }
}

/// Sequential reader over the canonical file.
pub struct CanonicalReader {
    inner: BufReader<File>,
    path: PathBuf,
    position: u64,
}

impl CanonicalReader {
    /// Read up to `max_bytes`.  Fewer bytes are returned only at the end
    /// of the file; an empty vector means end-of-stream.
    pub fn read(&mut self, max_bytes: usize) -> StorageResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(max_bytes.min(CHUNK_LEN));
        (&mut self.inner)
            .take(max_bytes as u64)
            .read_to_end(&mut buf)
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.position += buf.len() as u64;
        Ok(buf)
    }

    /// Number of bytes read so far.
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// `wallet.vault` + `.tmp` -> `wallet.vault.tmp`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
