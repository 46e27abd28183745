//! # Safehall Testkit
//!
//! Testing utilities for Safehall.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Key pool**: RSA-2048 key pairs generated once per test binary
//! - **Fixtures**: an org, a frozen clock and a store, with helpers to
//!   register principals and open channels
//! - **Faulty store**: a backend wrapper that fails incident or audit writes
//!   on demand
//! - **Generators**: Proptest strategies for policy inputs and message text
//!
//! ## Key Pool
//!
//! Generating RSA keys is slow, so tests draw from a shared pool:
//!
//! ```rust,no_run
//! use safehall_testkit::keys::pooled_key;
//!
//! let alice = pooled_key(0);
//! let bob = pooled_key(1);
//! assert_ne!(alice.fingerprint(), bob.fingerprint());
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use safehall_testkit::TestFixture;
//! use safehall_policy::Role;
//!
//! let fixture = TestFixture::new();
//! let teacher = fixture.register("t1", Role::Teacher).await;
//! ```

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod keys;

pub use faulty::FaultyStore;
pub use fixtures::{after_hours, school_hours, TestFixture, ORG};
pub use keys::{pooled_key, POOL_SIZE};
