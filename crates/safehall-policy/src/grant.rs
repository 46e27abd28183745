//! Channel membership grants.
//!
//! A grant is active while `left_at` is unset. Setting it is the single,
//! irreversible switch that ends the principal's access: there is no
//! operation that clears it again.

use serde::Serialize;

use safehall_core::{ChannelId, PrincipalId};

use crate::error::DeniedReason;
use crate::types::{Channel, PermissionLevel, Principal};

/// A principal's membership in one channel.
///
/// Serializable for reporting, but never deserialized: stores rebuild grants
/// through [`ParticipantGrant::restore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantGrant {
    principal: PrincipalId,
    channel_id: ChannelId,
    permission_level: PermissionLevel,
    /// Unix milliseconds.
    joined_at: i64,
    /// Unix milliseconds. Set once, never cleared.
    left_at: Option<i64>,
}

impl ParticipantGrant {
    /// Issue a new active grant.
    ///
    /// Fails with [`DeniedReason::CrossOrg`] if the principal belongs to a
    /// different institution than the channel. This is the only way to
    /// create a grant, so a cross-org grant can never exist.
    pub fn issue(
        principal: &Principal,
        channel: &Channel,
        permission_level: PermissionLevel,
        joined_at: i64,
    ) -> Result<Self, DeniedReason> {
        Self::restore(principal, channel, permission_level, joined_at, None)
    }

    /// Rebuild a stored grant, re-checking the org invariant.
    pub fn restore(
        principal: &Principal,
        channel: &Channel,
        permission_level: PermissionLevel,
        joined_at: i64,
        left_at: Option<i64>,
    ) -> Result<Self, DeniedReason> {
        if principal.org_id != channel.org_id {
            return Err(DeniedReason::CrossOrg);
        }
        Ok(Self {
            principal: principal.id.clone(),
            channel_id: channel.id.clone(),
            permission_level,
            joined_at,
            left_at,
        })
    }

    pub fn principal(&self) -> &PrincipalId {
        &self.principal
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn permission_level(&self) -> PermissionLevel {
        self.permission_level
    }

    pub fn joined_at(&self) -> i64 {
        self.joined_at
    }

    pub fn left_at(&self) -> Option<i64> {
        self.left_at
    }

    /// Active until terminated.
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }

    /// End the grant at `at`.
    ///
    /// Returns `true` if this call terminated it, `false` if it was already
    /// terminated (in which case the original `left_at` is kept).
    pub fn terminate(&mut self, at: i64) -> bool {
        if self.left_at.is_some() {
            return false;
        }
        self.left_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelMode, ChannelType, Role};

    fn principal(org: &str) -> Principal {
        Principal::new("stu-1", Role::Student, org, "Sam")
    }

    fn channel(org: &str) -> Channel {
        Channel::new("chan-1", ChannelType::Direct, ChannelMode::Moderated, org, "t-1").unwrap()
    }

    #[test]
    fn test_issue_same_org() {
        let grant = ParticipantGrant::issue(&principal("org-a"), &channel("org-a"), PermissionLevel::ReadWrite, 10).unwrap();
        assert!(grant.is_active());
        assert_eq!(grant.joined_at(), 10);
        assert_eq!(grant.principal().as_str(), "stu-1");
        assert_eq!(grant.channel_id().as_str(), "chan-1");
    }

    #[test]
    fn test_issue_cross_org_rejected() {
        assert_eq!(
            ParticipantGrant::issue(&principal("org-a"), &channel("org-b"), PermissionLevel::ReadWrite, 0),
            Err(DeniedReason::CrossOrg)
        );
        assert_eq!(
            ParticipantGrant::restore(&principal("org-a"), &channel("org-b"), PermissionLevel::ReadOnly, 0, Some(5)),
            Err(DeniedReason::CrossOrg)
        );
    }

    #[test]
    fn test_terminate_is_idempotent_and_irreversible() {
        let mut grant = ParticipantGrant::issue(&principal("o"), &channel("o"), PermissionLevel::Moderator, 0).unwrap();

        assert!(grant.terminate(100));
        assert!(!grant.is_active());
        assert_eq!(grant.left_at(), Some(100));

        assert!(!grant.terminate(200));
        assert_eq!(grant.left_at(), Some(100));
        assert!(!grant.is_active());
    }

    #[test]
    fn test_restore_keeps_termination() {
        let grant =
            ParticipantGrant::restore(&principal("o"), &channel("o"), PermissionLevel::ReadWrite, 1, Some(2)).unwrap();
        assert!(!grant.is_active());
        assert_eq!(grant.left_at(), Some(2));
    }
}
