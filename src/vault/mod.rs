//! Vault module — the encrypted profile of stored cards.
//!
//! This module provides:
//! - `Card` records and field validation (`card`)
//! - The decrypted `Profile` payload (`profile`)
//! - Binary envelope format with HMAC integrity (`format`)
//! - High-level `WalletStore` for creating, opening, and saving (`store`)

pub mod card;
pub mod format;
pub mod profile;
pub mod store;

pub use card::{Card, CardField, CardSummary, NewCard};
pub use format::{StoredArgon2Params, VaultHeader};
pub use profile::Profile;
pub use store::WalletStore;
