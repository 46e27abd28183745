//! # Safehall Core
//!
//! Pure primitives for the Safehall secure-messaging core: asymmetric keys,
//! signatures, fingerprints, strong identifiers, and the emergency-incident
//! model.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! safe to call concurrently from any thread.
//!
//! ## Key Types
//!
//! - [`KeyPair`] - An RSA-2048 key pair with its public-key fingerprint
//! - [`PublicKey`] / [`PrivateKey`] - Wrapped RSA keys (OAEP + PSS, SHA-256)
//! - [`Fingerprint`] - SHA-256 of the exported public key, colon-grouped hex
//! - [`EmergencyIncident`] - A safety incident and its status machine
//!
//! ## Failure Model
//!
//! Every cryptographic failure surfaces as a [`CryptoError`] variant that
//! tells the caller *what kind* of failure happened (structural, hostile, or
//! an expected wrong-key miss). Verification never errors: it answers
//! `true` or `false`.

pub mod clock;
pub mod crypto;
pub mod error;
pub mod incident;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use crypto::{Fingerprint, KeyPair, PrivateKey, PublicKey, Signature, MODULUS_BITS};
pub use error::{CryptoError, IncidentError};
pub use incident::{EmergencyIncident, IncidentKind, IncidentStatus, Reporter, Severity};
pub use types::{ChannelId, IncidentId, MessageId, OrgId, PrincipalId, RiskLevel};
