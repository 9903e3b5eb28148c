//! High-level profile operations used by the console.
//!
//! `WalletStore` turns the profile into an encrypted envelope and hands
//! the bytes to the storage core, which stages and commits them.  Every
//! save is a full-file replacement.

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::encryption;
use crate::crypto::kdf::{derive_master_key, generate_salt, Argon2Params};
use crate::crypto::keys::MasterKey;
use crate::errors::{Result, WalletCacheError};
use crate::storage::{CommitOutcome, FileKind, FsOps, StdFs, VaultFile};

use super::card::{Card, CardSummary, NewCard};
use super::format::{self, VaultHeader, CURRENT_VERSION};
use super::profile::Profile;

/// An unlocked profile.  Create one with `WalletStore::create` or
/// `WalletStore::open`.
pub struct WalletStore<F: FsOps = StdFs> {
    /// The transactional file the profile lives in.
    file: VaultFile<F>,

    /// Header metadata (salt, KDF params, creation time).
    header: VaultHeader,

    /// Decrypted cards.
    profile: Profile,

    /// The derived master key (zeroized on drop).
    master_key: MasterKey,
}

impl WalletStore<StdFs> {
    /// Create a new profile at `path`.  See [`WalletStore::create_in`].
    pub fn create(
        path: &Path,
        password: &[u8],
        argon2_params: Option<&Argon2Params>,
        replace_existing: bool,
    ) -> Result<Self> {
        Self::create_in(VaultFile::new(path), password, argon2_params, replace_existing)
    }

    /// Unlock the profile at `path`.  See [`WalletStore::open_in`].
    pub fn open(path: &Path, password: &[u8]) -> Result<Self> {
        Self::open_in(VaultFile::new(path), password)
    }
}

impl<F: FsOps> WalletStore<F> {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a new, empty profile and commit it.
    ///
    /// Fails with `VaultAlreadyExists` if a profile is already there,
    /// unless `replace_existing` is set; the old file is then replaced
    /// through a normal commit, never deleted first.
    pub fn create_in(
        file: VaultFile<F>,
        password: &[u8],
        argon2_params: Option<&Argon2Params>,
        replace_existing: bool,
    ) -> Result<Self> {
        if !replace_existing && file.exists(FileKind::Canonical) {
            return Err(WalletCacheError::VaultAlreadyExists(
                file.path(FileKind::Canonical).to_path_buf(),
            ));
        }

        let salt = generate_salt();
        let params = argon2_params.copied().unwrap_or_default();

        let mut master_bytes = derive_master_key(password, &salt, &params)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        let header = VaultHeader {
            version: CURRENT_VERSION,
            salt: salt.to_vec(),
            created_at: Utc::now(),
            argon2_params: params.into(),
        };

        let store = Self {
            file,
            header,
            profile: Profile::default(),
            master_key,
        };

        store.save()?;
        info!(path = %store.path().display(), "profile created");

        Ok(store)
    }

    /// Read, verify and decrypt an existing profile.
    ///
    /// A wrong password and a modified file both surface as
    /// `IntegrityCheckFailed`.
    pub fn open_in(file: VaultFile<F>, password: &[u8]) -> Result<Self> {
        let bytes = file.read_canonical()?;
        let raw = format::decode(&bytes)?;

        let params: Argon2Params = raw.header.argon2_params.into();
        let mut master_bytes = derive_master_key(password, &raw.header.salt, &params)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        let profile = Self::unseal(&master_key, &raw)?;
        debug!(cards = profile.len(), "profile unlocked");

        Ok(Self {
            file,
            header: raw.header,
            profile,
            master_key,
        })
    }

    /// Drop unsaved changes by re-reading the committed profile.
    pub fn reload(&mut self) -> Result<()> {
        let bytes = self.file.read_canonical()?;
        let raw = format::decode(&bytes)?;
        self.profile = Self::unseal(&self.master_key, &raw)?;
        self.header = raw.header;
        Ok(())
    }

    fn unseal(master_key: &MasterKey, raw: &format::RawVault) -> Result<Profile> {
        let mut hmac_key = master_key.derive_hmac_key()?;
        let verified = raw.verify(&hmac_key);
        hmac_key.zeroize();
        verified?;

        let mut payload_key = master_key.derive_payload_key()?;
        let plaintext = encryption::open(&payload_key, &raw.header_bytes, &raw.sealed_payload)
            .map(Zeroizing::new);
        payload_key.zeroize();

        serde_json::from_slice(&plaintext?)
            .map_err(|e| WalletCacheError::InvalidVaultFormat(format!("profile JSON: {e}")))
    }

    // ------------------------------------------------------------------
    // Card operations
    // ------------------------------------------------------------------

    /// Validate and add a card.  Returns its id.
    pub fn add_card(&mut self, input: &NewCard) -> Result<u32> {
        // Validate before reserving the id so rejected input burns nothing.
        let card = input.to_card(self.profile.next_id(), Utc::now())?;
        let id = self.profile.allocate_id();
        self.profile.insert(card);
        Ok(id)
    }

    /// Remove a card.
    pub fn delete_card(&mut self, id: u32) -> Result<()> {
        if !self.profile.remove(id) {
            return Err(WalletCacheError::CardNotFound(id));
        }
        Ok(())
    }

    /// Look up a card by id.
    pub fn card(&self, id: u32) -> Result<&Card> {
        self.profile
            .get(id)
            .ok_or(WalletCacheError::CardNotFound(id))
    }

    /// Id and label of every card, sorted by id.
    pub fn list_cards(&self) -> Vec<CardSummary> {
        self.profile.summaries()
    }

    pub fn card_count(&self) -> usize {
        self.profile.len()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Seal the profile and commit it as the new vault file.
    ///
    /// A failed staging write never reaches the commit step.
    pub fn save(&self) -> Result<CommitOutcome> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&self.profile)
                .map_err(|e| WalletCacheError::SerializationError(format!("profile: {e}")))?,
        );

        let header_bytes = format::serialize_header(&self.header)?;

        let mut payload_key = self.master_key.derive_payload_key()?;
        let sealed = encryption::seal(&payload_key, &header_bytes, &plaintext);
        payload_key.zeroize();
        let sealed = sealed?;

        let mut hmac_key = self.master_key.derive_hmac_key()?;
        let envelope = format::encode(&header_bytes, &sealed, &hmac_key);
        hmac_key.zeroize();
        let envelope = envelope?;

        self.file.write_staging(&envelope)?;
        let outcome = self.file.commit()?;
        debug!(?outcome, bytes = envelope.len(), "profile saved");
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        self.file.path(FileKind::Canonical)
    }

    /// Returns the underlying transactional file.
    pub fn file(&self) -> &VaultFile<F> {
        &self.file
    }

    /// Returns the profile creation timestamp.
    pub fn created_at(&self) -> chrono::DateTime<Utc> {
        self.header.created_at
    }

    /// Returns a reference to the vault header.
    pub fn header(&self) -> &VaultHeader {
        &self.header
    }
}
