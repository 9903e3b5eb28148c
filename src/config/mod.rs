//! Configuration loaded from `.walletcache.toml`.

pub mod settings;

pub use settings::Settings;
