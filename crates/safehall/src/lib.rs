//! # Safehall
//!
//! Secure messaging core for institutional communication: end-to-end
//! encrypted direct channels, deterministic content-safety analysis,
//! role- and time-based access policy, and emergency escalation.
//!
//! ## Overview
//!
//! A message travels through five stages:
//!
//! 1. **Policy gate**: the sender's grant, role and office hours are checked
//! 2. **Analysis**: the plaintext is scored against the lexicon
//! 3. **Encryption**: only on encrypted channels, for the single peer
//! 4. **Append**: the store re-checks the grant atomically with the write
//! 5. **Escalation**: a critical assessment files an incident
//!
//! The safety button bypasses all of this: it files a critical incident and
//! terminates every grant of the principal who pressed it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use safehall::{generate_key_pair_async, Messenger, MessengerConfig};
//! use safehall::policy::{ChannelMode, ChannelType, MessageKind, PermissionLevel, Principal, Role};
//! use safehall::store::SqliteStore;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("safehall.db").unwrap());
//!
//!     let me = Principal::new("t1", Role::Teacher, "school-1", "Ms. Rivera");
//!     let keys = generate_key_pair_async().await.unwrap();
//!     let messenger = Messenger::new(store, me, keys, MessengerConfig::default()).unwrap();
//!     messenger.publish_identity().await.unwrap();
//!
//!     let channel = messenger
//!         .create_channel(
//!             ChannelType::Direct,
//!             ChannelMode::Encrypted,
//!             &[("s1".into(), PermissionLevel::ReadWrite)],
//!         )
//!         .await
//!         .unwrap();
//!
//!     let outcome = messenger
//!         .send(&channel.id, "see you at 3", MessageKind::Text)
//!         .await
//!         .unwrap();
//!     assert!(outcome.is_delivered());
//! }
//! ```
//!
//! ## Re-exports
//!
//! The component crates are re-exported:
//!
//! - `safehall::core` - keys, identifiers, clock, incidents
//! - `safehall::cipher` - hybrid envelope encryption
//! - `safehall::safety` - content analyzer and lexicon
//! - `safehall::policy` - principals, channels, grants, access checks
//! - `safehall::store` - collaborator traits and backends

mod audit;
pub mod config;
pub mod error;
pub mod escalation;
pub mod messenger;
pub mod telemetry;

// Re-export component crates
pub use safehall_cipher as cipher;
pub use safehall_core as core;
pub use safehall_policy as policy;
pub use safehall_safety as safety;
pub use safehall_store as store;

// Re-export main types for convenience
pub use config::MessengerConfig;
pub use error::{MessengerError, Result};
pub use escalation::{EmergencyOutcome, EscalationCoordinator};
pub use messenger::{generate_key_pair_async, Messenger, SendOutcome};
pub use telemetry::init_tracing;

pub use safehall_cipher::EncryptedEnvelope;
pub use safehall_core::{ChannelId, IncidentId, KeyPair, MessageId, PrincipalId};
pub use safehall_policy::{Decision, DeniedReason};
pub use safehall_safety::{conversation_starters, ContentAssessment};
