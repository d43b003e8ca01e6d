//! Key derivation using Argon2id.
//!
//! The store file carries no salt or header, so every session must derive
//! the same key from the same passphrase. The salt is therefore a fixed
//! application constant rather than a per-file random value.

use argon2::Argon2;
use zeroize::ZeroizeOnDrop;

use crate::error::{Result, SecretaryError};

/// Argon2id parameters.
///
/// - Memory: 64 MB (64 * 1024 KB)
/// - Iterations: 3
/// - Parallelism: 1
const ARGON2_MEMORY_KB: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 1;

/// Length of derived key in bytes (256 bits for AES-256-GCM).
pub const KEY_LENGTH: usize = 32;

/// Application salt used by [`CryptKey::from_passphrase`].
pub const DEFAULT_SALT: &[u8; 16] = b"TDkmQ2TyV6HRw7pW";

/// A symmetric key derived from a passphrase.
///
/// Key material is zeroized when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct CryptKey {
    key: [u8; KEY_LENGTH],
}

impl CryptKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key: bytes }
    }

    /// Derive the session key for `passphrase` with the application salt.
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        derive_key(passphrase, DEFAULT_SALT)
    }

    /// Get a reference to the raw key bytes.
    ///
    /// Avoid storing or logging this value.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for CryptKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive an encryption key from a passphrase using Argon2id.
///
/// Same passphrase and salt always produce the same key.
///
/// # Examples
///
/// ```
/// use secretary_core::crypto::derive_key;
///
/// let key = derive_key("my-passphrase", b"sixteen-byte-salt").unwrap();
/// assert_eq!(key.as_bytes().len(), 32);
/// ```
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<CryptKey> {
    if passphrase.is_empty() {
        return Err(SecretaryError::InvalidInput(
            "Passphrase cannot be empty".to_string(),
        ));
    }

    if salt.len() < 16 {
        return Err(SecretaryError::InvalidInput(
            "Salt must be at least 16 bytes".to_string(),
        ));
    }

    let params = argon2::Params::new(
        ARGON2_MEMORY_KB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(KEY_LENGTH),
    )
    .map_err(|e| SecretaryError::Crypto(format!("Failed to create Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| SecretaryError::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(CryptKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_deterministic() {
        let key1 = CryptKey::from_passphrase("test-passphrase").unwrap();
        let key2 = CryptKey::from_passphrase("test-passphrase").unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_passphrase_different_key() {
        let key1 = CryptKey::from_passphrase("passphrase-one").unwrap();
        let key2 = CryptKey::from_passphrase("passphrase-two").unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key("test-passphrase", b"salt1-1234567890123456").unwrap();
        let key2 = derive_key("test-passphrase", b"salt2-1234567890123456").unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        let result = CryptKey::from_passphrase("");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Passphrase cannot be empty"));
    }

    #[test]
    fn test_short_salt_rejected() {
        let result = derive_key("test-passphrase", b"short");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Salt must be at least 16 bytes"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = CryptKey::from_bytes([0xab; KEY_LENGTH]);

        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains(&hex::encode(&key.as_bytes()[..4])));
    }
}
