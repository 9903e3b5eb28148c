//! `walletcache open` — the interactive console session (default command).
//!
//! The session takes the vault lock, runs startup recovery, then drives
//! the start menu and, once logged in, the profile menus.  Every change
//! is saved right away through the commit protocol.

use std::fs;
use std::path::Path;

use dialoguer::Confirm;
use tracing::{info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::cli::menu::{CardAction, ProfileChoice, StartChoice, Ui};
use crate::cli::{load_settings, output, prompt_new_password, prompt_password, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, WalletCacheError};
use crate::storage::{CommitOutcome, FileKind, VaultFile, VaultLock};
use crate::vault::{CardField, WalletStore};

/// Execute the `open` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (cwd, settings) = load_settings()?;
    let vault_path = vault_path(cli, &cwd, &settings);

    if let Some(dir) = vault_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!(dir = %dir.display(), "created vault directory");
        }
    }

    let _lock = VaultLock::acquire(&vault_path)?;
    let file = VaultFile::new(&vault_path);
    let report = file.recover()?;

    let mut ui = Ui::new(settings.clear_screen);
    for line in output::recovery_messages(&report) {
        ui.notify_warning(line);
    }

    loop {
        match ui.start_menu(file.exists(FileKind::Canonical))? {
            StartChoice::Exit => return Ok(()),
            StartChoice::CreateProfile => {
                let exists = file.exists(FileKind::Canonical);
                if let Some(store) = create_profile(&mut ui, &vault_path, &settings, exists)? {
                    profile_session(&mut ui, store)?;
                }
            }
            StartChoice::Login => {
                if let Some(store) = login(&mut ui, &vault_path)? {
                    profile_session(&mut ui, store)?;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Start menu actions
// ---------------------------------------------------------------------------

fn create_profile(
    ui: &mut Ui,
    vault_path: &Path,
    settings: &Settings,
    exists: bool,
) -> Result<Option<WalletStore>> {
    if exists {
        let replace = Confirm::new()
            .with_prompt("A profile already exists. Replace it and lose its cards?")
            .default(false)
            .interact()
            .map_err(|e| WalletCacheError::CommandFailed(format!("confirmation prompt: {e}")))?;
        if !replace {
            ui.notify_warning("Kept the existing profile.");
            return Ok(None);
        }
    }

    let password = prompt_new_password()?;
    ui.display_hashing();

    let params = settings.argon2_params();
    match WalletStore::create(vault_path, password.as_bytes(), Some(&params), exists) {
        Ok(store) => {
            ui.notify_success("Profile created.");
            Ok(Some(store))
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            ui.notify_error(format!("Could not create the profile: {e}"));
            Ok(None)
        }
    }
}

fn login(ui: &mut Ui, vault_path: &Path) -> Result<Option<WalletStore>> {
    let password = prompt_password()?;
    ui.display_hashing();

    match WalletStore::open(vault_path, password.as_bytes()) {
        Ok(store) => Ok(Some(store)),
        Err(WalletCacheError::IntegrityCheckFailed) => {
            ui.notify_error("Incorrect password");
            Ok(None)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            ui.notify_error(e.to_string());
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Profile menu
// ---------------------------------------------------------------------------

fn profile_session(ui: &mut Ui, mut store: WalletStore) -> Result<()> {
    loop {
        match ui.profile_menu(store.card_count())? {
            ProfileChoice::Exit => return Ok(()),
            ProfileChoice::List => {
                while let Some(id) = ui.card_list_menu("Cards", &store.list_cards())? {
                    card_details(ui, &mut store, id)?;
                }
            }
            ProfileChoice::Add => add_card(ui, &mut store)?,
            ProfileChoice::Delete => {
                if let Some(id) = ui.card_list_menu("Delete card", &store.list_cards())? {
                    delete_card(ui, &mut store, id)?;
                }
            }
        }
    }
}

fn add_card(ui: &mut Ui, store: &mut WalletStore) -> Result<()> {
    let Some(mut input) = ui.prompt_new_card()? else {
        ui.notify_warning("Cancelled, no card added.");
        return Ok(());
    };

    let added = store.add_card(&input);
    input.zeroize();

    match added {
        Ok(_) => save_changes(ui, store, "Card added."),
        Err(e) => {
            ui.notify_error(e.to_string());
            Ok(())
        }
    }
}

fn card_details(ui: &mut Ui, store: &mut WalletStore, id: u32) -> Result<()> {
    let mut visible = false;
    loop {
        let action = ui.card_info_menu(store.card(id)?, visible)?;
        match action {
            CardAction::Return => return Ok(()),
            CardAction::ToggleVisibility => visible = !visible,
            CardAction::Copy(field) => {
                let value = Zeroizing::new(store.card(id)?.field_value(field));
                match copy_to_clipboard(&value) {
                    Ok(()) => ui.notify_success(format!("{} copied to clipboard.", field_name(field))),
                    Err(e) => ui.notify_error(e.to_string()),
                }
            }
            CardAction::Delete => {
                if delete_card(ui, store, id)? {
                    return Ok(());
                }
            }
        }
    }
}

/// Returns whether the card was removed.
fn delete_card(ui: &mut Ui, store: &mut WalletStore, id: u32) -> Result<bool> {
    if !ui.confirm_delete(store.card(id)?)? {
        ui.notify_warning("Nothing deleted.");
        return Ok(false);
    }
    store.delete_card(id)?;
    save_changes(ui, store, "Card deleted.")?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Commit the profile.  A failed save rolls the in-memory profile back
/// to what is on disk; only a failed restore ends the session.
fn save_changes(ui: &mut Ui, store: &mut WalletStore, done: &str) -> Result<()> {
    match store.save() {
        Ok(CommitOutcome::Committed) => ui.notify_success(done),
        Ok(CommitOutcome::CommittedWithStaleBackup) => {
            ui.notify_success(done);
            ui.notify_warning("A leftover backup file remains; it is removed on the next save.");
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(error = %e, "save failed, reloading committed profile");
            ui.notify_error(format!("Save failed, previous data preserved. ({e})"));
            store.reload()?;
        }
    }
    Ok(())
}

fn copy_to_clipboard(value: &str) -> Result<()> {
    arboard::Clipboard::new()
        .and_then(|mut clipboard| clipboard.set_text(value.to_owned()))
        .map_err(|e| WalletCacheError::ClipboardError(e.to_string()))
}

/// `Number: ` -> `Number`
fn field_name(field: CardField) -> &'static str {
    field.label().trim_end_matches(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_drop_the_separator() {
        assert_eq!(field_name(CardField::Cvv), "CVV");
        assert_eq!(field_name(CardField::Expiration), "Expiration");
    }
}
