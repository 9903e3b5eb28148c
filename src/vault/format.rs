//! Binary vault envelope and HMAC integrity verification.
//!
//! The bytes handed to the storage core have this layout:
//!
//! ```text
//! [WCVT: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][sealed payload][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`WCVT`): identifies the file as a WalletCache vault.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the sealed payload begins.
//! - **Header JSON**: serialized `VaultHeader` (salt, KDF params).
//! - **Sealed payload**: AES-256-GCM `nonce || ciphertext` of the profile.
//! - **HMAC-SHA256**: 32-byte tag over header + sealed payload bytes.
//!
//! This module only builds and splits envelopes; reading and writing
//! the file is the storage core's job.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::kdf::Argon2Params;
use crate::errors::{Result, WalletCacheError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"WCVT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// VaultHeader
// ---------------------------------------------------------------------------

/// Argon2 parameters stored in the header so a profile re-opens with
/// the settings it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArgon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<Argon2Params> for StoredArgon2Params {
    fn from(p: Argon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

impl From<StoredArgon2Params> for Argon2Params {
    fn from(p: StoredArgon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

/// Plaintext metadata at the beginning of a vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultHeader {
    /// Format version.
    pub version: u8,

    /// The salt used for Argon2id key derivation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// When the profile was created.
    pub created_at: DateTime<Utc>,

    /// Argon2 params used at profile creation.
    pub argon2_params: StoredArgon2Params,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize `header` to the exact bytes stored in the envelope.
///
/// The payload is sealed with these bytes as associated data, so they
/// must be produced once and passed to both sealing and [`encode`].
pub fn serialize_header(header: &VaultHeader) -> Result<Vec<u8>> {
    serde_json::to_vec(header)
        .map_err(|e| WalletCacheError::SerializationError(format!("header: {e}")))
}

/// Build the full envelope from serialized header bytes and an already
/// sealed payload.
pub fn encode(header_bytes: &[u8], sealed_payload: &[u8], hmac_key: &[u8]) -> Result<Vec<u8>> {
    let hmac_tag = compute_hmac(hmac_key, header_bytes, sealed_payload)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        WalletCacheError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let total = PREFIX_LEN + header_bytes.len() + sealed_payload.len() + HMAC_LEN;
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(header_bytes); // header JSON
    buf.extend_from_slice(sealed_payload); // nonce || ciphertext
    buf.extend_from_slice(&hmac_tag); // 32 bytes

    Ok(buf)
}

/// An envelope split into its parts, with the raw bytes kept so the
/// HMAC is verified over exactly what was on disk.
pub struct RawVault {
    pub header: VaultHeader,
    /// The raw header JSON bytes exactly as stored.
    pub header_bytes: Vec<u8>,
    /// AES-256-GCM `nonce || ciphertext`.
    pub sealed_payload: Vec<u8>,
    /// The HMAC tag stored at the end of the file.
    pub stored_hmac: Vec<u8>,
}

impl RawVault {
    /// Check the stored HMAC with `hmac_key`.
    pub fn verify(&self, hmac_key: &[u8]) -> Result<()> {
        verify_hmac(
            hmac_key,
            &self.header_bytes,
            &self.sealed_payload,
            &self.stored_hmac,
        )
    }
}

/// Split envelope bytes and parse the header.
///
/// The caller must call [`RawVault::verify`] before trusting anything
/// but the salt and KDF params.
pub fn decode(data: &[u8]) -> Result<RawVault> {
    let min_size = PREFIX_LEN + HMAC_LEN;
    if data.len() < min_size {
        return Err(WalletCacheError::InvalidVaultFormat(
            "file too small to be a valid vault".into(),
        ));
    }

    // --- Parse the fixed-size prefix ---

    if &data[0..4] != MAGIC {
        return Err(WalletCacheError::InvalidVaultFormat(
            "missing WCVT magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(WalletCacheError::InvalidVaultFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| WalletCacheError::InvalidVaultFormat("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        WalletCacheError::InvalidVaultFormat(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| end + HMAC_LEN <= data.len())
        .ok_or_else(|| {
            WalletCacheError::InvalidVaultFormat("header length exceeds file size".into())
        })?;

    // --- Extract the variable-length sections as raw bytes ---

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let payload_end = data.len() - HMAC_LEN;
    let sealed_payload = data[header_end..payload_end].to_vec();
    let stored_hmac = data[payload_end..].to_vec();

    let header: VaultHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| WalletCacheError::InvalidVaultFormat(format!("header JSON: {e}")))?;

    Ok(RawVault {
        header,
        header_bytes,
        sealed_payload,
        stored_hmac,
    })
}

/// Compute HMAC-SHA256 over header + sealed payload bytes.
pub fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], sealed_payload: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| WalletCacheError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(sealed_payload);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the HMAC in constant time (`Mac::verify_slice`).
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    sealed_payload: &[u8],
    expected_hmac: &[u8],
) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| WalletCacheError::HmacError(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(sealed_payload);

    mac.verify_slice(expected_hmac)
        .map_err(|_| WalletCacheError::IntegrityCheckFailed)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
