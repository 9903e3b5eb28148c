//! `walletcache version` — display the version and build details.

use console::style;

use crate::errors::Result;
use crate::storage::{BACKUP_SUFFIX, STAGING_SUFFIX};
use crate::vault::format::CURRENT_VERSION;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    println!("walletcache {}", env!("CARGO_PKG_VERSION"));
    println!(
        "{} vault format v{CURRENT_VERSION}, staging `{STAGING_SUFFIX}`, backup `{BACKUP_SUFFIX}`",
        style("\u{2192}").dim()
    );
    Ok(())
}
