//! AES-256-GCM authenticated encryption with `ring`.
//!
//! Byte form is `nonce || ciphertext || tag` with a fresh random 96-bit
//! nonce per call. String form is URL-safe base64 of the byte form, which is
//! what field values are stored as.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use ring::aead::{
    self, Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey, NONCE_LEN,
};
use ring::rand::{SecureRandom, SystemRandom};

use super::key::CryptKey;
use crate::error::{Result, SecretaryError};

static AEAD_ALG: &aead::Algorithm = &aead::AES_256_GCM;

/// Yields exactly one nonce, so each bound key seals or opens once.
struct SingleNonce(Option<[u8; NONCE_LEN]>);

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

impl CryptKey {
    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce)
            .map_err(|_| SecretaryError::Crypto("failed to generate nonce".to_string()))?;

        let unbound = UnboundKey::new(AEAD_ALG, self.as_bytes())
            .map_err(|_| SecretaryError::Crypto("failed to create AES-256-GCM key".to_string()))?;
        let mut sealing = SealingKey::new(unbound, SingleNonce(Some(nonce)));

        let mut in_out = plaintext.to_vec();
        sealing
            .seal_in_place_append_tag(Aad::empty(), &mut in_out)
            .map_err(|_| SecretaryError::Crypto("seal failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }

    /// Decrypt the output of [`CryptKey::encrypt`].
    ///
    /// Returns [`SecretaryError::IncorrectKey`] when authentication fails.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN + AEAD_ALG.tag_len() {
            return Err(SecretaryError::IncorrectKey);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        let unbound = UnboundKey::new(AEAD_ALG, self.as_bytes())
            .map_err(|_| SecretaryError::Crypto("failed to create AES-256-GCM key".to_string()))?;
        let mut opening = OpeningKey::new(unbound, SingleNonce(Some(nonce)));

        let mut in_out = ciphertext.to_vec();
        let plaintext = opening
            .open_in_place(Aad::empty(), &mut in_out)
            .map_err(|_| SecretaryError::IncorrectKey)?;
        Ok(plaintext.to_vec())
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<String> {
        Ok(URL_SAFE.encode(self.encrypt(plaintext.as_bytes())?))
    }

    pub fn decrypt_str(&self, token: &str) -> Result<String> {
        let sealed = URL_SAFE
            .decode(token.trim())
            .map_err(|e| SecretaryError::Crypto(format!("ciphertext is not base64: {}", e)))?;
        String::from_utf8(self.decrypt(&sealed)?)
            .map_err(|_| SecretaryError::Crypto("decrypted value is not UTF-8".to_string()))
    }
}
