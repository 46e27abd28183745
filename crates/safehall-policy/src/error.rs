//! Denial reasons and policy errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ChannelType;

/// Why an action was denied.
///
/// These are user-facing outcomes, not security incidents. The messages are
/// safe to show to the person who attempted the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedReason {
    /// Students may only send outside emergencies during office hours.
    #[error("messaging is only available during office hours")]
    OutsideHours,

    /// The principal's role does not permit this action.
    #[error("your role does not permit this action")]
    Role,

    /// The principal and channel belong to different institutions.
    #[error("participants must belong to the same institution")]
    CrossOrg,

    /// No grant exists for this principal on this channel.
    #[error("you are not a participant in this channel")]
    NotParticipant,

    /// The grant only permits reading.
    #[error("you have read-only access to this channel")]
    ReadOnly,

    /// The grant was terminated by a leave or an escalation.
    #[error("your access to this channel has ended")]
    GrantTerminated,
}

/// Errors building policy values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Encrypted channels carry exactly two participants.
    #[error("encrypted mode requires a direct channel, got {0:?}")]
    EncryptedRequiresDirect(ChannelType),

    /// An office-hours window ends before it starts.
    #[error("office-hours window ends before it starts")]
    EmptyWindow,
}

/// Result type for policy construction.
pub type Result<T> = std::result::Result<T, PolicyError>;
