//! Integration tests for the transactional vault file.
//!
//! Failures are injected through the `FsOps` seam: `FailNth` fails a
//! single filesystem call, `CrashAfter` fails every call past a budget,
//! which is what a process crash looks like to the files on disk, and
//! `DiskFull` lets a staging file accept only so many bytes.

use std::cell::Cell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use proptest::prelude::*;
use tempfile::TempDir;
use walletcache::errors::{RenameStep, StorageError};
use walletcache::storage::{CommitOutcome, DurableWrite, FileKind, FsOps, StdFs, VaultFile};

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// Fails the `n`-th filesystem call (0-based) and only that one.
struct FailNth {
    n: usize,
    calls: Cell<usize>,
}

impl FailNth {
    fn new(n: usize) -> Self {
        Self {
            n,
            calls: Cell::new(0),
        }
    }

    fn check(&self) -> io::Result<()> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == self.n {
            return Err(io::Error::other(format!("injected failure at call {call}")));
        }
        Ok(())
    }
}

impl FsOps for FailNth {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check()?;
        StdFs.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check()?;
        StdFs.remove_file(path)
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        self.check()?;
        StdFs.sync_dir(dir)
    }
}

/// Lets `budget` filesystem calls through, then fails all of them.
struct CrashAfter {
    budget: Cell<usize>,
}

impl CrashAfter {
    fn new(budget: usize) -> Self {
        Self {
            budget: Cell::new(budget),
        }
    }

    fn check(&self) -> io::Result<()> {
        match self.budget.get() {
            0 => Err(io::Error::other("simulated crash")),
            left => {
                self.budget.set(left - 1);
                Ok(())
            }
        }
    }
}

impl FsOps for CrashAfter {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check()?;
        StdFs.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check()?;
        StdFs.remove_file(path)
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        self.check()?;
        StdFs.sync_dir(dir)
    }
}

/// Staging files accept `limit` bytes and then report a full disk.
/// Renames are counted so tests can tell whether a commit was attempted.
struct DiskFull {
    limit: usize,
    renames: Rc<Cell<usize>>,
}

struct CappedFile {
    file: fs::File,
    room: usize,
}

impl Write for CappedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.room == 0 {
            return Err(io::Error::other("no space left on device"));
        }
        let n = self.file.write(&buf[..buf.len().min(self.room)])?;
        self.room -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl DurableWrite for CappedFile {
    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

impl FsOps for DiskFull {
    fn create(&self, path: &Path) -> io::Result<Box<dyn DurableWrite>> {
        Ok(Box::new(CappedFile {
            file: fs::File::create(path)?,
            room: self.limit,
        }))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.renames.set(self.renames.get() + 1);
        StdFs.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        StdFs.remove_file(path)
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        StdFs.sync_dir(dir)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn vault_path(dir: &TempDir) -> PathBuf {
    dir.path().join("wallet.vault")
}

/// Commit `payload` with the real filesystem.
fn commit_payload(path: &Path, payload: &[u8]) -> CommitOutcome {
    let file = VaultFile::new(path);
    file.write_staging(payload).unwrap();
    file.commit().unwrap()
}

fn assert_no_leftovers(file: &VaultFile<impl FsOps>) {
    assert!(!file.exists(FileKind::Staging), "staging file left behind");
    assert!(!file.exists(FileKind::Backup), "backup file left behind");
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn first_commit_creates_canonical() {
    let dir = TempDir::new().unwrap();
    let file = VaultFile::new(vault_path(&dir));

    file.write_staging(b"v1").unwrap();
    assert!(!file.exists(FileKind::Canonical));
    assert_eq!(file.commit().unwrap(), CommitOutcome::Committed);

    assert_eq!(file.read_canonical().unwrap(), b"v1");
    assert_no_leftovers(&file);
}

#[test]
fn second_commit_replaces_canonical() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    assert_eq!(commit_payload(&path, b"v2"), CommitOutcome::Committed);

    let file = VaultFile::new(&path);
    assert_eq!(file.read_canonical().unwrap(), b"v2");
    assert_eq!(file.size_of(FileKind::Canonical), 2);
    assert_no_leftovers(&file);
}

#[test]
fn failed_promotion_keeps_previous_payload() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    // Calls: 0 canonical->backup, 1 staging->canonical (fails), 2 restore.
    let file = VaultFile::with_fs(&path, FailNth::new(1));
    file.write_staging(b"v2").unwrap();
    let err = file.commit().unwrap_err();

    assert!(matches!(
        err,
        StorageError::RenameFailed {
            step: RenameStep::StagingToCanonical,
            ..
        }
    ));
    assert!(!err.is_fatal());
    assert_eq!(file.read_canonical().unwrap(), b"v1");
    assert_no_leftovers(&file);
}

// ---------------------------------------------------------------------------
// Failure paths of the commit protocol
// ---------------------------------------------------------------------------

#[test]
fn failed_move_to_backup_leaves_canonical_untouched() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    let file = VaultFile::with_fs(&path, FailNth::new(0));
    file.write_staging(b"v2").unwrap();
    let err = file.commit().unwrap_err();

    assert!(matches!(
        err,
        StorageError::RenameFailed {
            step: RenameStep::CanonicalToBackup,
            ..
        }
    ));
    assert_eq!(file.read_canonical().unwrap(), b"v1");
    assert_no_leftovers(&file);
}

#[test]
fn failed_first_promotion_discards_staging() {
    let dir = TempDir::new().unwrap();
    let file = VaultFile::with_fs(vault_path(&dir), FailNth::new(0));

    file.write_staging(b"v1").unwrap();
    assert!(file.commit().is_err());

    assert!(!file.exists(FileKind::Canonical));
    assert_no_leftovers(&file);
}

#[test]
fn failed_restore_is_fatal_and_recoverable() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    // Only canonical->backup succeeds; promotion and restore both fail.
    let file = VaultFile::with_fs(&path, CrashAfter::new(1));
    file.write_staging(b"v2").unwrap();
    let err = file.commit().unwrap_err();

    match &err {
        StorageError::CommitRestoreFailed { backup, .. } => {
            assert_eq!(backup, &path.with_extension("vault.bak"));
        }
        other => panic!("expected CommitRestoreFailed, got {other:?}"),
    }
    assert!(err.is_fatal());
    assert!(!file.exists(FileKind::Canonical));
    assert_eq!(fs::read(file.path(FileKind::Backup)).unwrap(), b"v1");

    let file = VaultFile::new(&path);
    let report = file.recover().unwrap();
    assert!(report.restored_from_backup);
    assert!(report.discarded_staging);
    assert_eq!(file.read_canonical().unwrap(), b"v1");
    assert_no_leftovers(&file);
}

#[test]
fn failed_backup_removal_is_stale_backup_outcome() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    // Calls: 0 c->b, 1 s->c, 2 sync, 3 remove backup (fails).
    let file = VaultFile::with_fs(&path, FailNth::new(3));
    file.write_staging(b"v2").unwrap();
    assert_eq!(
        file.commit().unwrap(),
        CommitOutcome::CommittedWithStaleBackup
    );
    assert_eq!(file.read_canonical().unwrap(), b"v2");
    assert!(file.exists(FileKind::Backup));

    // The next commit clears the stale backup before doing anything else.
    assert_eq!(commit_payload(&path, b"v3"), CommitOutcome::Committed);
    let file = VaultFile::new(&path);
    assert_eq!(file.read_canonical().unwrap(), b"v3");
    assert_no_leftovers(&file);
}

#[test]
fn failed_dir_sync_keeps_backup() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    let file = VaultFile::with_fs(&path, FailNth::new(2));
    file.write_staging(b"v2").unwrap();
    assert_eq!(
        file.commit().unwrap(),
        CommitOutcome::CommittedWithStaleBackup
    );
    assert_eq!(fs::read(file.path(FileKind::Backup)).unwrap(), b"v1");

    let report = VaultFile::new(&path).recover().unwrap();
    assert!(report.removed_stale_backup);
    assert_eq!(file.read_canonical().unwrap(), b"v2");
}

#[test]
fn commit_refuses_when_backup_is_the_only_copy() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    let file = VaultFile::new(&path);
    fs::write(file.path(FileKind::Backup), b"v1").unwrap();

    file.write_staging(b"v2").unwrap();
    assert!(matches!(
        file.commit(),
        Err(StorageError::RecoveryRequired(_))
    ));
    assert_eq!(fs::read(file.path(FileKind::Backup)).unwrap(), b"v1");
    assert!(!file.exists(FileKind::Canonical));
    assert!(!file.exists(FileKind::Staging));

    let report = file.recover().unwrap();
    assert!(report.restored_from_backup);
    assert!(!report.discarded_staging);
    assert_eq!(file.read_canonical().unwrap(), b"v1");
}

#[test]
fn failed_stale_backup_removal_aborts_commit() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    // Call 0 is removing the leftover backup.
    let file = VaultFile::with_fs(&path, FailNth::new(0));
    fs::write(file.path(FileKind::Backup), b"v0").unwrap();
    file.write_staging(b"v2").unwrap();
    match file.commit() {
        Err(StorageError::Io { path: failed, .. }) => {
            assert_eq!(failed, file.path(FileKind::Backup))
        }
        other => panic!("expected Io error, got {other:?}"),
    }
    assert!(!file.exists(FileKind::Staging));
    assert_eq!(file.read_canonical().unwrap(), b"v1");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn crash_at_every_step_leaves_old_or_new_payload() {
    // Calls of a replacing commit: c->b, s->c, sync, remove backup.
    let expected: [&[u8]; 5] = [b"v1", b"v1", b"v2", b"v2", b"v2"];

    for (budget, want) in expected.iter().enumerate() {
        let dir = TempDir::new().unwrap();
        let path = vault_path(&dir);
        commit_payload(&path, b"v1");

        let file = VaultFile::with_fs(&path, CrashAfter::new(budget));
        file.write_staging(b"v2").unwrap();
        let _ = file.commit();

        let file = VaultFile::new(&path);
        file.recover().unwrap();
        assert_eq!(
            file.read_canonical().unwrap(),
            *want,
            "crash after {budget} filesystem calls"
        );
        assert_no_leftovers(&file);
    }
}

#[test]
fn crash_while_staging_keeps_previous_payload() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    // A crash mid-write leaves a truncated staging file and nothing else.
    let file = VaultFile::new(&path);
    fs::write(file.path(FileKind::Staging), b"v2-part").unwrap();

    let report = file.recover().unwrap();
    assert!(report.discarded_staging);
    assert_eq!(file.read_canonical().unwrap(), b"v1");
}

#[test]
fn reads_without_writes_are_identical() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, &[0x42; 200_000]);

    let file = VaultFile::new(&path);
    let first = file.read_canonical().unwrap();
    let second = file.read_canonical().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 200_000);
}

#[test]
fn failed_staging_write_never_reaches_canonical() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    let file = VaultFile::new(&path);
    // A directory where the staging file should go makes the write fail.
    fs::create_dir(file.path(FileKind::Staging)).unwrap();

    assert!(file.write_staging(b"v2").is_err());
    assert_eq!(file.read_canonical().unwrap(), b"v1");
    assert!(!file.exists(FileKind::Backup));
}

#[test]
fn short_staging_write_is_discarded_before_commit() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    let renames = Rc::new(Cell::new(0));
    let file = VaultFile::with_fs(&path, DiskFull {
        limit: 10_000,
        renames: Rc::clone(&renames),
    });
    let err = file.write_staging(&[0x42; 100_000]).unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));

    assert!(!file.exists(FileKind::Staging));
    assert!(!file.exists(FileKind::Backup));
    assert_eq!(file.read_canonical().unwrap(), b"v1");
    assert!(matches!(file.commit(), Err(StorageError::NotFound(_))));
    assert_eq!(renames.get(), 0);
}

#[test]
fn staging_write_does_not_touch_canonical_until_commit() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    commit_payload(&path, b"v1");

    let file = VaultFile::new(&path);
    file.write_staging(b"v2").unwrap();
    assert_eq!(file.read_canonical().unwrap(), b"v1");
    assert_eq!(file.size_of(FileKind::Staging), 2);
}

#[test]
fn streaming_read_in_chunks() {
    let dir = TempDir::new().unwrap();
    let path = vault_path(&dir);
    let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    commit_payload(&path, &payload);

    let file = VaultFile::new(&path);
    let mut reader = file.begin_canonical_read().unwrap();
    let mut collected = Vec::new();
    loop {
        let chunk = reader.read(4096).unwrap();
        if chunk.is_empty() {
            break;
        }
        assert!(chunk.len() <= 4096);
        collected.extend_from_slice(&chunk);
    }
    assert_eq!(reader.position(), 10_000);
    assert_eq!(collected, payload);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_crash_recovery_is_atomic(
        old in prop::collection::vec(any::<u8>(), 0..4096),
        new in prop::collection::vec(any::<u8>(), 0..4096),
        budget in 0usize..6,
    ) {
        let dir = TempDir::new().unwrap();
        let path = vault_path(&dir);
        commit_payload(&path, &old);

        let file = VaultFile::with_fs(&path, CrashAfter::new(budget));
        file.write_staging(&new).unwrap();
        let _ = file.commit();

        let file = VaultFile::new(&path);
        file.recover().unwrap();
        let on_disk = file.read_canonical().unwrap();
        prop_assert!(on_disk == old || on_disk == new);
        prop_assert!(!file.exists(FileKind::Staging));
        prop_assert!(!file.exists(FileKind::Backup));
    }
}
