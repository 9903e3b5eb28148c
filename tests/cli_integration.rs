//! Integration tests for the WalletCache CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! The interactive console needs a terminal, so we focus on the
//! non-interactive commands (--help, version, status, recover).

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: get a Command pointing at the walletcache binary.
fn walletcache() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("walletcache").expect("binary should exist");
    cmd.env_remove("WALLETCACHE_VAULT")
        .env_remove("WALLETCACHE_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_flag_shows_usage() {
    walletcache()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted payment-card vault"))
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("recover"))
        .stdout(predicate::str::contains("--vault"));
}

#[test]
fn version_command_shows_version() {
    walletcache()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn status_on_empty_directory_reports_no_profile() {
    let tmp = TempDir::new().unwrap();

    walletcache()
        .arg("status")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("wallet.vault"))
        .stdout(predicate::str::contains("No profile"));
}

#[test]
fn status_flags_leftover_backup() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("cards.vault");
    tmp.child("cards.vault.bak").write_binary(b"old").unwrap();

    walletcache()
        .args(["--vault", vault.path().to_str().unwrap(), "status"])
        .assert()
        .success()
        .stderr(predicate::str::contains("interrupted"));
}

#[test]
fn recover_restores_backup_and_discards_staging() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("cards.vault");
    let backup = tmp.child("cards.vault.bak");
    let staging = tmp.child("cards.vault.tmp");
    backup.write_binary(b"last good").unwrap();
    staging.write_binary(b"half written").unwrap();

    walletcache()
        .args(["--vault", vault.path().to_str().unwrap(), "recover"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored"))
        .stdout(predicate::str::contains("Recovery complete"));

    vault.assert(predicate::path::exists());
    vault.assert("last good");
    backup.assert(predicate::path::missing());
    staging.assert(predicate::path::missing());
}

#[test]
fn recover_on_clean_vault_does_nothing() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("cards.vault");
    vault.write_binary(b"current").unwrap();

    walletcache()
        .args(["--vault", vault.path().to_str().unwrap(), "recover"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to recover"));

    vault.assert("current");
}

#[test]
fn vault_path_from_environment() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.child("env.vault");
    vault.write_binary(b"x").unwrap();

    walletcache()
        .env("WALLETCACHE_VAULT", vault.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("env.vault"));
}

#[test]
fn malformed_config_fails() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".walletcache.toml")
        .write_str("vault_dir = [not toml")
        .unwrap();

    walletcache()
        .arg("status")
        .current_dir(tmp.path())
        .assert()
        .failure();
}

#[test]
fn completions_unknown_shell_fails() {
    walletcache()
        .args(["completions", "csh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown shell"));
}
