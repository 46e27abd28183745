//! # Safehall Cipher
//!
//! Authenticated hybrid encryption for direct messages.
//!
//! ## Encryption Model
//!
//! RSA bounds the plaintext it can carry, so each message gets a fresh
//! symmetric key:
//!
//! 1. **Content Key**: a random 256-bit ChaCha20-Poly1305 key encrypts the body
//! 2. **Wrapped Key**: the content key is encrypted to the recipient with RSA-OAEP
//! 3. **Signature**: the sender signs the *ciphertext* with RSA-PSS
//!
//! Signing the ciphertext lets anyone holding the sender's public key check
//! integrity without being able to read the message.
//!
//! ## Decryption Order
//!
//! [`HybridCipher::decrypt`] runs three independent checks and stops at the
//! first failure, never exposing partial plaintext:
//!
//! | Step | Check | Failure |
//! |------|-------|---------|
//! | 1 | sender signature over ciphertext | [`CryptoError::SignatureInvalid`] |
//! | 2 | unwrap content key | [`CryptoError::KeyMismatch`] |
//! | 3 | AEAD open | [`CryptoError::TamperDetected`] |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use safehall_cipher::{EncryptedEnvelope, HybridCipher};
//! use safehall_core::KeyPair;
//!
//! let alice = KeyPair::generate().unwrap();
//! let bob = KeyPair::generate().unwrap();
//!
//! let envelope = HybridCipher::encrypt(b"see you at 3", bob.public_key(), alice.private_key()).unwrap();
//! let json = envelope.to_json().unwrap();
//!
//! let received = EncryptedEnvelope::from_json(&json).unwrap();
//! let plaintext = HybridCipher::decrypt(&received, bob.private_key(), alice.public_key()).unwrap();
//! assert_eq!(plaintext, b"see you at 3");
//! ```

pub mod aead;
pub mod envelope;
pub mod hybrid;

pub use aead::{ContentKey, Nonce};
pub use envelope::EncryptedEnvelope;
pub use hybrid::HybridCipher;
pub use safehall_core::CryptoError;

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
