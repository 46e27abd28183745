//! Error types for Safehall Core.

use thiserror::Error;

use crate::incident::IncidentStatus;

/// Errors raised by key handling and message cryptography.
///
/// The variants are deliberately coarse: callers branch on the *class* of
/// failure, never on library internals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Malformed key, envelope, or encoding. Structural, not a security event.
    #[error("malformed input: {0}")]
    Format(String),

    /// The sender signature did not verify.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The wrapped content key could not be opened with this private key.
    #[error("wrapped key does not belong to this private key")]
    KeyMismatch,

    /// The authenticated ciphertext failed its integrity check.
    #[error("ciphertext failed authentication")]
    TamperDetected,

    /// The RNG or key generator failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Encryption or signing failed.
    #[error("encryption failed: {0}")]
    Encryption(String),
}

impl CryptoError {
    /// Whether this failure should be treated as hostile input.
    pub fn is_hostile(&self) -> bool {
        matches!(self, CryptoError::SignatureInvalid | CryptoError::TamperDetected)
    }
}

/// Errors from the incident status machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncidentError {
    #[error("invalid incident transition: {from} -> {to}")]
    InvalidTransition {
        from: IncidentStatus,
        to: IncidentStatus,
    },
}
