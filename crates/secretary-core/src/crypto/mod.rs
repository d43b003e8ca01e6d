//! Passphrase key derivation and authenticated encryption.

mod cipher;
mod key;

pub use key::{derive_key, CryptKey, DEFAULT_SALT, KEY_LENGTH};
