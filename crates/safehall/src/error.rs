//! Error types for the Messenger.

use safehall_core::{ChannelId, CryptoError, PrincipalId};
use safehall_policy::{DeniedReason, PolicyError};
use safehall_safety::SafetyError;
use safehall_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Messenger operations.
///
/// Send-time policy denials are not errors; they come back as
/// [`SendOutcome::Denied`](crate::SendOutcome::Denied).
#[derive(Debug, Error)]
pub enum MessengerError {
    /// Cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The configured lexicon could not be compiled.
    #[error("safety lexicon error: {0}")]
    Safety(#[from] SafetyError),

    /// Invalid channel construction.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// The operation was refused by the access policy.
    #[error("denied: {0}")]
    Denied(#[from] DeniedReason),

    /// Channel not found.
    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelId),

    /// Principal not found.
    #[error("principal not found: {0}")]
    PrincipalNotFound(PrincipalId),

    /// The principal has not published a public key.
    #[error("no public key published for {0}")]
    PublicKeyNotFound(PrincipalId),

    /// The channel cannot carry an end-to-end encrypted message.
    #[error("encryption unavailable: {0}")]
    EncryptionUnavailable(String),

    /// The requested participant list is not valid for the channel type.
    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    /// Malformed configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A blocking crypto task was cancelled or panicked.
    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Result type for Messenger operations.
pub type Result<T> = std::result::Result<T, MessengerError>;
