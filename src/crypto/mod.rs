//! Cryptographic primitives for WalletCache.
//!
//! This module provides:
//! - AES-256-GCM sealing bound to the envelope header (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF-based payload key and HMAC key derivation (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{open, seal};
pub use kdf::{derive_master_key, generate_salt, Argon2Params};
pub use keys::{derive_hmac_key, derive_payload_key, MasterKey};
