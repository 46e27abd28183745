//! Symmetric authenticated encryption.
//!
//! ChaCha20-Poly1305 with a 256-bit key and 96-bit nonce. A fresh key and
//! nonce are drawn for every message, so nonce reuse cannot occur under one
//! key.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305,
};
use rand::RngCore;

use crate::{CryptoError, Result};

/// Size of a content key in bytes.
pub const KEY_LEN: usize = 32;

/// Size of a nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// A 256-bit symmetric content key.
#[derive(Clone)]
pub struct ContentKey([u8; KEY_LEN]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Rebuild from an unwrapped slice.
    ///
    /// A slice of the wrong length means the wrapped key was not produced by
    /// this protocol.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::KeyMismatch)?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &Nonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        cipher
            .encrypt(chacha20poly1305::Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Decrypt data with this key.
    ///
    /// Any authentication failure is reported as tampering.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &Nonce) -> Result<Vec<u8>> {
        let cipher =
            ChaCha20Poly1305::new_from_slice(&self.0).map_err(|_| CryptoError::TamperDetected)?;

        cipher
            .decrypt(chacha20poly1305::Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CryptoError::TamperDetected)
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// A 96-bit nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a decoded wire field.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; NONCE_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::Format(format!("nonce must be {NONCE_LEN} bytes, got {}", bytes.len())))?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = ContentKey::generate();
        let nonce = Nonce::generate();
        let plaintext = b"hello, world!";

        let ciphertext = key.encrypt(plaintext, &nonce).unwrap();
        assert_ne!(ciphertext, plaintext);

        let decrypted = key.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_key_is_tamper() {
        let nonce = Nonce::generate();
        let ciphertext = ContentKey::generate().encrypt(b"secret", &nonce).unwrap();

        assert_eq!(
            ContentKey::generate().decrypt(&ciphertext, &nonce),
            Err(CryptoError::TamperDetected)
        );
    }

    #[test]
    fn test_flipped_bit_is_tamper() {
        let key = ContentKey::generate();
        let nonce = Nonce::generate();
        let mut ciphertext = key.encrypt(b"secret", &nonce).unwrap();
        ciphertext[0] ^= 0x01;

        assert_eq!(key.decrypt(&ciphertext, &nonce), Err(CryptoError::TamperDetected));
    }

    #[test]
    fn test_slice_lengths() {
        assert!(ContentKey::from_slice(&[0u8; 31]).is_err());
        assert!(ContentKey::from_slice(&[0u8; 32]).is_ok());
        assert!(matches!(Nonce::from_slice(&[0u8; 16]), Err(CryptoError::Format(_))));
        assert_eq!(Nonce::from_slice(&[7u8; 12]).unwrap(), Nonce::from_bytes([7u8; 12]));
    }

    #[test]
    fn test_key_debug_is_redacted() {
        assert_eq!(format!("{:?}", ContentKey::from_bytes([1; 32])), "ContentKey(<redacted>)");
    }
}
