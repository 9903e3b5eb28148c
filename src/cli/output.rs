//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::storage::{FileKind, FsOps, RecoveryReport, VaultFile};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of the canonical, staging and backup files.
pub fn print_file_table<F: FsOps>(file: &VaultFile<F>) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Path", "Present", "Size"]);

    for (name, kind) in [
        ("vault", FileKind::Canonical),
        ("staging", FileKind::Staging),
        ("backup", FileKind::Backup),
    ] {
        let present = file.exists(kind);
        table.add_row(vec![
            name.to_string(),
            file.path(kind).display().to_string(),
            if present { "yes" } else { "no" }.to_string(),
            if present {
                format!("{} bytes", file.size_of(kind))
            } else {
                "-".to_string()
            },
        ]);
    }

    println!("{table}");
}

/// One line per action taken by startup recovery.
pub fn recovery_messages(report: &RecoveryReport) -> Vec<&'static str> {
    let mut lines = Vec::new();
    if report.restored_from_backup {
        lines.push("A previous save was interrupted; the last saved profile was restored.");
    }
    if report.removed_stale_backup {
        lines.push("Removed a leftover backup from a completed save.");
    }
    if report.discarded_staging {
        lines.push("Discarded an unfinished save.");
    }
    lines
}
