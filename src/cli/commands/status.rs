//! `walletcache status` — show the vault files on disk.
//!
//! Read-only: nothing is renamed or removed, so it is safe to run while
//! a session holds the lock.

use crate::cli::{load_settings, output, vault_path, Cli};
use crate::errors::Result;
use crate::storage::{FileKind, FsOps, VaultFile};

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let file = VaultFile::new(vault_path(cli, &cwd, &settings));

    output::info(&format!(
        "Vault file: {}",
        file.path(FileKind::Canonical).display()
    ));
    output::print_file_table(&file);

    match pending_recovery(&file) {
        Some(reason) => {
            output::warning(reason);
            output::tip("Run `walletcache recover` or open the console to resolve it.");
        }
        None if file.exists(FileKind::Canonical) => output::success("Vault is consistent."),
        None => output::info("No profile has been created yet."),
    }

    Ok(())
}

/// Why startup recovery would have work to do, if it would.
pub fn pending_recovery<F: FsOps>(file: &VaultFile<F>) -> Option<&'static str> {
    let canonical = file.exists(FileKind::Canonical);
    if file.exists(FileKind::Backup) {
        return Some(if canonical {
            "A backup from a completed save is still on disk."
        } else {
            "A save was interrupted; the vault must be restored from its backup."
        });
    }
    if file.exists(FileKind::Staging) {
        return Some("An unfinished save left a staging file behind.");
    }
    None
}
