//! Sub-key derivation with HKDF-SHA256.
//!
//! From the Argon2id master key we derive two independent keys:
//! - the **payload key** that seals the profile with AES-256-GCM;
//! - the **HMAC key** that authenticates the whole vault envelope.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{Result, WalletCacheError};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

const PAYLOAD_INFO: &[u8] = b"walletcache-payload-key";
const HMAC_INFO: &[u8] = b"walletcache-hmac-key";

/// Derive the payload encryption key from the master key.
pub fn derive_payload_key(master_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(master_key, PAYLOAD_INFO)
}

/// Derive the envelope HMAC key from the master key.
pub fn derive_hmac_key(master_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(master_key, HMAC_INFO)
}

// The master key already came out of Argon2id, so the extract step uses
// HKDF's zero salt.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| WalletCacheError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte master key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn derive_payload_key(&self) -> Result<[u8; KEY_LEN]> {
        derive_payload_key(&self.bytes)
    }

    pub fn derive_hmac_key(&self) -> Result<[u8; KEY_LEN]> {
        derive_hmac_key(&self.bytes)
    }
}
