//! # Safehall Store
//!
//! Collaborator interfaces for the Safehall messaging core, with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The messenger never touches a database directly. It talks to four narrow
//! traits, all of which a single backend implements:
//!
//! - [`KeyDirectory`] - published SPKI public keys per principal
//! - [`ChannelStore`] - principals, channels, participant grants, messages
//! - [`IncidentStore`] - emergency incidents and their status transitions
//! - [`AuditLog`] - append-only audit trail
//!
//! [`Backend`] bundles them. [`SqliteStore`] is the persistent backend and
//! [`MemoryStore`] has the same semantics for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use safehall_store::{ChannelStore, SqliteStore};
//! use safehall_policy::{Principal, Role};
//!
//! async fn example() {
//!     let store = SqliteStore::open("safehall.db").unwrap();
//!
//!     let teacher = Principal::new("t1", Role::Teacher, "school-1", "Ms. Rivera");
//!     store.put_principal(&teacher).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Grant re-check on append**: `append_message` looks at the sender's
//!   grant inside the same transaction as the insert, so an emergency that
//!   terminated the grant first always wins.
//! - **One grant per pair**: a (channel, principal) pair gets one grant for
//!   its lifetime. Termination is permanent.
//! - **Encodings**: message bodies and assessments are JSON; incidents and
//!   audit events are CBOR blobs.

pub mod error;
pub mod memory;
pub mod migration;
pub mod records;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use records::{AppendResult, AuditEntry, AuditEvent, MessageBody, StoredMessage};
pub use sqlite::SqliteStore;
pub use traits::{AuditLog, Backend, ChannelStore, IncidentStore, KeyDirectory};
