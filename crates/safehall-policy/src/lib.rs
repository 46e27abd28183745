//! # Safehall Policy
//!
//! Role-, grant-, and time-based access control for channels.
//!
//! ## Rules
//!
//! | Role | May access | May create |
//! |------|------------|------------|
//! | student | direct | direct |
//! | parent | direct | direct |
//! | teacher | direct, announcement | direct, announcement |
//! | admin | all | all |
//!
//! Sending additionally requires an active grant with write permission.
//! Students may only send during office hours, except for emergency-kind
//! messages, which bypass the hours gate for every role.
//!
//! ## Institutions
//!
//! A grant can only be issued to a principal of the channel's institution
//! ([`ParticipantGrant::issue`]). Cross-institution membership is therefore
//! impossible by construction and never surfaces as a send-time failure.
//!
//! ## Denials
//!
//! Checks return a [`Decision`], not an error. A [`DeniedReason`] has a
//! user-presentable message and carries no internal detail.

pub mod engine;
pub mod error;
pub mod grant;
pub mod hours;
pub mod types;

pub use engine::{AccessPolicy, Decision};
pub use error::{DeniedReason, PolicyError, Result};
pub use grant::ParticipantGrant;
pub use hours::{OfficeHours, OfficeWindow};
pub use types::{Channel, ChannelMode, ChannelType, MessageKind, PermissionLevel, Principal, Role};
