//! AES-256-GCM sealing of the profile payload.
//!
//! A sealed payload is `nonce (12) || ciphertext || tag (16)`.  The
//! envelope header travels as associated data, so a payload only opens
//! under the exact header bytes it was sealed with.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{Result, WalletCacheError};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Seal `plaintext` under a 32-byte `key`, binding `header` to it.
pub fn seal(key: &[u8], header: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| WalletCacheError::EncryptionFailed("payload key must be 32 bytes".into()))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let body = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: header,
            },
        )
        .map_err(|_| WalletCacheError::EncryptionFailed("AES-GCM seal failed".into()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + body.len());
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&body);
    Ok(sealed)
}

/// Open a payload produced by [`seal`] with the same key and header.
///
/// Every failure, including a header mismatch, is `DecryptionFailed`.
pub fn open(key: &[u8], header: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(WalletCacheError::DecryptionFailed);
    }
    let (nonce, body) = sealed.split_at(NONCE_LEN);

    Aes256Gcm::new_from_slice(key)
        .map_err(|_| WalletCacheError::DecryptionFailed)?
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: body,
                aad: header,
            },
        )
        .map_err(|_| WalletCacheError::DecryptionFailed)
}
