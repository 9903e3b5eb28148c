//! CLI module — Clap argument parser, output helpers, menus, and command
//! implementations.

pub mod commands;
pub mod menu;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, WalletCacheError};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable that supplies the master password.
pub const PASSWORD_ENV: &str = "WALLETCACHE_PASSWORD";

/// WalletCache CLI: encrypted payment-card vault.
#[derive(Parser)]
#[command(
    name = "walletcache",
    about = "Encrypted payment-card vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the vault file (default: .walletcache/wallet.vault)
    #[arg(long, global = true, env = "WALLETCACHE_VAULT")]
    pub vault: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Open the interactive console (default)
    Open,

    /// Show the vault files on disk and whether recovery is needed
    Status,

    /// Resolve leftovers from an interrupted save
    Recover,

    /// Show version
    Version,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Settings from the working directory's `.walletcache.toml`.
pub fn load_settings() -> Result<(PathBuf, Settings)> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    Ok((cwd, settings))
}

/// The vault path: `--vault` if given, otherwise derived from settings.
pub fn vault_path(cli: &Cli, cwd: &Path, settings: &Settings) -> PathBuf {
    match &cli.vault {
        Some(path) => path.clone(),
        None => settings.vault_path(cwd),
    }
}

/// Get the master password from `WALLETCACHE_PASSWORD` or a masked prompt.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter the profile master password")
        .interact()
        .map_err(|e| WalletCacheError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new master password with confirmation.
///
/// Also respects `WALLETCACHE_PASSWORD` for scripted use.  Enforces a
/// minimum password length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        check_password_strength(&pw)?;
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Enter a master password")
                .with_confirmation(
                    "Confirm your master password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| WalletCacheError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if let Err(e) = check_password_strength(&password) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }

        return Ok(password);
    }
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Reject passwords shorter than the minimum length.
pub fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WalletCacheError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
