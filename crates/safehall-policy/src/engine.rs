//! The access-policy engine.
//!
//! Every check is a pure function of its arguments and the configured
//! office hours. The engine never reads storage: callers pass the current
//! grant and must re-check it atomically at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeniedReason;
use crate::grant::ParticipantGrant;
use crate::hours::OfficeHours;
use crate::types::{Channel, ChannelType, MessageKind, Principal, Role};

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DeniedReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn denied_reason(&self) -> Option<DeniedReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }

    /// Convert to a `Result` for `?` chaining.
    pub fn into_result(self) -> Result<(), DeniedReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

impl From<Result<(), DeniedReason>> for Decision {
    fn from(result: Result<(), DeniedReason>) -> Self {
        match result {
            Ok(()) => Decision::Allow,
            Err(reason) => Decision::Deny(reason),
        }
    }
}

/// Channel types a role may use. Creation and access share one table.
fn role_covers(role: Role, channel_type: ChannelType) -> bool {
    match role {
        Role::Student | Role::Parent => channel_type == ChannelType::Direct,
        Role::Teacher => matches!(channel_type, ChannelType::Direct | ChannelType::Announcement),
        Role::Admin => true,
    }
}

/// Table-driven role, grant, and time-window checks.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    office_hours: OfficeHours,
}

impl AccessPolicy {
    pub fn new(office_hours: OfficeHours) -> Self {
        Self { office_hours }
    }

    pub fn office_hours(&self) -> &OfficeHours {
        &self.office_hours
    }

    /// May `principal` send a `kind` message on `channel` at `now`?
    ///
    /// Checks, in order: the grant exists and belongs to this principal and
    /// channel, is active, permits writing; the role may use the channel
    /// type and message kind; students are inside office hours unless the
    /// message is an emergency.
    pub fn can_send_message(
        &self,
        principal: &Principal,
        channel: &Channel,
        grant: Option<&ParticipantGrant>,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Decision {
        self.check_send(principal, channel, grant, kind, now).into()
    }

    fn check_send(
        &self,
        principal: &Principal,
        channel: &Channel,
        grant: Option<&ParticipantGrant>,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Result<(), DeniedReason> {
        let grant = grant
            .filter(|g| g.principal() == &principal.id && g.channel_id() == &channel.id)
            .ok_or(DeniedReason::NotParticipant)?;

        if !grant.is_active() {
            return Err(DeniedReason::GrantTerminated);
        }
        if !grant.permission_level().can_write() {
            return Err(DeniedReason::ReadOnly);
        }
        if !role_covers(principal.role, channel.channel_type) {
            return Err(DeniedReason::Role);
        }
        if kind == MessageKind::Announcement && !matches!(principal.role, Role::Teacher | Role::Admin) {
            return Err(DeniedReason::Role);
        }
        if principal.role == Role::Student && kind != MessageKind::Emergency && !self.office_hours.contains(now) {
            return Err(DeniedReason::OutsideHours);
        }
        Ok(())
    }

    /// May `role` create a channel of `channel_type`?
    pub fn can_create_channel(&self, role: Role, channel_type: ChannelType) -> Decision {
        if role_covers(role, channel_type) {
            Decision::Allow
        } else {
            Decision::Deny(DeniedReason::Role)
        }
    }

    /// May `role` open a channel of `channel_type`?
    pub fn can_access_channel(&self, role: Role, channel_type: ChannelType, is_participant: bool) -> Decision {
        if !is_participant {
            Decision::Deny(DeniedReason::NotParticipant)
        } else if role_covers(role, channel_type) {
            Decision::Allow
        } else {
            Decision::Deny(DeniedReason::Role)
        }
    }

    /// May `sender` open a direct conversation with `recipient`?
    pub fn can_message_peer(&self, sender: &Principal, recipient: &Principal) -> Decision {
        if sender.org_id != recipient.org_id {
            Decision::Deny(DeniedReason::CrossOrg)
        } else if sender.role == Role::Student && recipient.role == Role::Student {
            Decision::Deny(DeniedReason::Role)
        } else {
            Decision::Allow
        }
    }

    /// May `role` file an emergency or concern? Always yes.
    pub fn can_report_incident(&self, _role: Role) -> Decision {
        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelMode, PermissionLevel};
    use chrono::TimeZone;

    const ROLES: [Role; 4] = [Role::Student, Role::Teacher, Role::Parent, Role::Admin];
    const TYPES: [ChannelType; 3] = [ChannelType::Direct, ChannelType::Announcement, ChannelType::Emergency];

    // Tuesday
    fn weekday_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, hour, 0, 0).unwrap()
    }

    fn saturday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap()
    }

    fn principal(role: Role) -> Principal {
        Principal::new(format!("{role}-1"), role, "org-a", role.as_str())
    }

    fn channel(channel_type: ChannelType) -> Channel {
        Channel::new("chan-1", channel_type, ChannelMode::Moderated, "org-a", "admin-1").unwrap()
    }

    fn grant(p: &Principal, c: &Channel, level: PermissionLevel) -> ParticipantGrant {
        ParticipantGrant::issue(p, c, level, 0).unwrap()
    }

    #[test]
    fn test_student_outside_hours_denied_but_emergency_allowed() {
        let policy = AccessPolicy::default();
        let student = principal(Role::Student);
        let chan = channel(ChannelType::Direct);
        let g = grant(&student, &chan, PermissionLevel::ReadWrite);

        assert_eq!(
            policy.can_send_message(&student, &chan, Some(&g), MessageKind::Text, weekday_at(20)),
            Decision::Deny(DeniedReason::OutsideHours)
        );
        assert_eq!(
            policy.can_send_message(&student, &chan, Some(&g), MessageKind::Emergency, weekday_at(20)),
            Decision::Allow
        );
        assert_eq!(
            policy.can_send_message(&student, &chan, Some(&g), MessageKind::Text, weekday_at(10)),
            Decision::Allow
        );
        assert_eq!(
            policy.can_send_message(&student, &chan, Some(&g), MessageKind::Text, saturday_noon()),
            Decision::Deny(DeniedReason::OutsideHours)
        );
    }

    #[test]
    fn test_non_students_ignore_hours() {
        let policy = AccessPolicy::default();
        let chan = channel(ChannelType::Direct);
        for role in [Role::Teacher, Role::Parent, Role::Admin] {
            let p = principal(role);
            let g = grant(&p, &chan, PermissionLevel::ReadWrite);
            assert!(policy
                .can_send_message(&p, &chan, Some(&g), MessageKind::Text, weekday_at(23))
                .is_allowed());
        }
    }

    #[test]
    fn test_send_requires_grant() {
        let policy = AccessPolicy::default();
        let teacher = principal(Role::Teacher);
        let chan = channel(ChannelType::Direct);

        assert_eq!(
            policy.can_send_message(&teacher, &chan, None, MessageKind::Text, weekday_at(10)),
            Decision::Deny(DeniedReason::NotParticipant)
        );

        // A grant held by someone else is no grant at all.
        let admin = principal(Role::Admin);
        let other = grant(&admin, &chan, PermissionLevel::Moderator);
        assert_eq!(
            policy.can_send_message(&teacher, &chan, Some(&other), MessageKind::Text, weekday_at(10)),
            Decision::Deny(DeniedReason::NotParticipant)
        );
    }

    #[test]
    fn test_read_only_and_terminated() {
        let policy = AccessPolicy::default();
        let teacher = principal(Role::Teacher);
        let chan = channel(ChannelType::Direct);

        let read_only = grant(&teacher, &chan, PermissionLevel::ReadOnly);
        assert_eq!(
            policy.can_send_message(&teacher, &chan, Some(&read_only), MessageKind::Text, weekday_at(10)),
            Decision::Deny(DeniedReason::ReadOnly)
        );

        let mut ended = grant(&teacher, &chan, PermissionLevel::Moderator);
        ended.terminate(5);
        assert_eq!(
            policy.can_send_message(&teacher, &chan, Some(&ended), MessageKind::Emergency, weekday_at(10)),
            Decision::Deny(DeniedReason::GrantTerminated)
        );
    }

    #[test]
    fn test_announcement_kind_restricted() {
        let policy = AccessPolicy::default();
        let chan = channel(ChannelType::Direct);

        let student = principal(Role::Student);
        let g = grant(&student, &chan, PermissionLevel::ReadWrite);
        assert_eq!(
            policy.can_send_message(&student, &chan, Some(&g), MessageKind::Announcement, weekday_at(10)),
            Decision::Deny(DeniedReason::Role)
        );

        let teacher = principal(Role::Teacher);
        let g = grant(&teacher, &chan, PermissionLevel::ReadWrite);
        assert!(policy
            .can_send_message(&teacher, &chan, Some(&g), MessageKind::Announcement, weekday_at(10))
            .is_allowed());
    }

    #[test]
    fn test_student_in_announcement_channel_denied() {
        let policy = AccessPolicy::default();
        let student = principal(Role::Student);
        let chan = channel(ChannelType::Announcement);
        let g = grant(&student, &chan, PermissionLevel::ReadWrite);
        assert_eq!(
            policy.can_send_message(&student, &chan, Some(&g), MessageKind::Text, weekday_at(10)),
            Decision::Deny(DeniedReason::Role)
        );
    }

    #[test]
    fn test_create_channel_table() {
        let policy = AccessPolicy::default();
        let expected = |role: Role, t: ChannelType| match (role, t) {
            (_, ChannelType::Direct) => true,
            (Role::Teacher | Role::Admin, ChannelType::Announcement) => true,
            (Role::Admin, ChannelType::Emergency) => true,
            _ => false,
        };
        for role in ROLES {
            for t in TYPES {
                assert_eq!(policy.can_create_channel(role, t).is_allowed(), expected(role, t), "{role} {t}");
            }
        }
    }

    #[test]
    fn test_access_channel_table() {
        let policy = AccessPolicy::default();
        let expected = |role: Role, t: ChannelType| match (role, t) {
            (Role::Admin, _) => true,
            (Role::Teacher, ChannelType::Direct | ChannelType::Announcement) => true,
            (Role::Student | Role::Parent, ChannelType::Direct) => true,
            _ => false,
        };
        for role in ROLES {
            for t in TYPES {
                assert_eq!(policy.can_access_channel(role, t, true).is_allowed(), expected(role, t), "{role} {t}");
                assert_eq!(
                    policy.can_access_channel(role, t, false),
                    Decision::Deny(DeniedReason::NotParticipant)
                );
            }
        }
    }

    #[test]
    fn test_message_peer() {
        let policy = AccessPolicy::default();
        let student = principal(Role::Student);
        let other_student = Principal::new("student-2", Role::Student, "org-a", "Kim");
        let teacher = principal(Role::Teacher);
        let foreign_teacher = Principal::new("teacher-9", Role::Teacher, "org-b", "Lee");

        assert_eq!(policy.can_message_peer(&student, &other_student), Decision::Deny(DeniedReason::Role));
        assert_eq!(policy.can_message_peer(&student, &teacher), Decision::Allow);
        assert_eq!(policy.can_message_peer(&teacher, &foreign_teacher), Decision::Deny(DeniedReason::CrossOrg));
    }

    #[test]
    fn test_everyone_can_report() {
        let policy = AccessPolicy::default();
        for role in ROLES {
            assert!(policy.can_report_incident(role).is_allowed());
        }
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(Decision::Deny(DeniedReason::OutsideHours)).unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["reason"], "outside_hours");
        assert_eq!(Decision::from(Err(DeniedReason::Role)).denied_reason(), Some(DeniedReason::Role));
    }
}
