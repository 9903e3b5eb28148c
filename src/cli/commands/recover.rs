//! `walletcache recover` — resolve leftovers from an interrupted save.

use crate::cli::{load_settings, output, vault_path, Cli};
use crate::errors::Result;
use crate::storage::{VaultFile, VaultLock};

/// Execute the `recover` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let path = vault_path(cli, &cwd, &settings);

    let report = if path.parent().map_or(true, |dir| dir.as_os_str().is_empty() || dir.exists()) {
        let _lock = VaultLock::acquire(&path)?;
        VaultFile::new(&path).recover()?
    } else {
        // No vault directory means nothing was ever written.
        Default::default()
    };

    if report.is_clean() {
        output::success("Nothing to recover.");
        return Ok(());
    }
    for line in output::recovery_messages(&report) {
        output::info(line);
    }
    output::success("Recovery complete.");
    Ok(())
}
