//! Principals, channels, and message kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

use safehall_core::{ChannelId, OrgId, PrincipalId};

use crate::error::{PolicyError, Result};

macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $name {
            /// Stable lowercase name, as stored.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $s),+
                }
            }

            /// Parse the stable lowercase name.
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($s => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// A principal's role within its institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Parent,
    Admin,
}

str_enum!(Role {
    Student => "student",
    Teacher => "teacher",
    Parent => "parent",
    Admin => "admin",
});

/// A person who can hold grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    pub org_id: OrgId,
    pub display_name: String,
}

impl Principal {
    pub fn new(id: impl Into<PrincipalId>, role: Role, org_id: impl Into<OrgId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            org_id: org_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Channel category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Direct,
    Announcement,
    Emergency,
}

str_enum!(ChannelType {
    Direct => "direct",
    Announcement => "announcement",
    Emergency => "emergency",
});

/// How message bodies are stored, fixed when the channel is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Plaintext, visible to moderators.
    Moderated,
    /// End-to-end encrypted; only the two participants can read.
    Encrypted,
}

str_enum!(ChannelMode {
    Moderated => "moderated",
    Encrypted => "encrypted",
});

/// A messaging channel. Never spans two institutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub channel_type: ChannelType,
    pub mode: ChannelMode,
    pub org_id: OrgId,
    pub created_by: PrincipalId,
}

impl Channel {
    /// Build a channel, rejecting encrypted non-direct channels.
    pub fn new(
        id: impl Into<ChannelId>,
        channel_type: ChannelType,
        mode: ChannelMode,
        org_id: impl Into<OrgId>,
        created_by: impl Into<PrincipalId>,
    ) -> Result<Self> {
        if mode == ChannelMode::Encrypted && channel_type != ChannelType::Direct {
            return Err(PolicyError::EncryptedRequiresDirect(channel_type));
        }
        Ok(Self {
            id: id.into(),
            channel_type,
            mode,
            org_id: org_id.into(),
            created_by: created_by.into(),
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.mode == ChannelMode::Encrypted
    }
}

/// What a grant permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    ReadOnly,
    ReadWrite,
    Moderator,
}

str_enum!(PermissionLevel {
    ReadOnly => "read_only",
    ReadWrite => "read_write",
    Moderator => "moderator",
});

impl PermissionLevel {
    pub fn can_write(&self) -> bool {
        matches!(self, PermissionLevel::ReadWrite | PermissionLevel::Moderator)
    }
}

/// Kind of message being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Announcement,
    /// Bypasses the office-hours gate for every role.
    Emergency,
}

str_enum!(MessageKind {
    Text => "text",
    Announcement => "announcement",
    Emergency => "emergency",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypted_requires_direct() {
        assert!(Channel::new("c1", ChannelType::Direct, ChannelMode::Encrypted, "org", "t1").is_ok());
        assert_eq!(
            Channel::new("c2", ChannelType::Announcement, ChannelMode::Encrypted, "org", "t1"),
            Err(PolicyError::EncryptedRequiresDirect(ChannelType::Announcement))
        );
        assert!(Channel::new("c3", ChannelType::Emergency, ChannelMode::Moderated, "org", "a1").is_ok());
    }

    #[test]
    fn test_names_roundtrip() {
        for role in [Role::Student, Role::Teacher, Role::Parent, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
            assert_eq!(serde_json::to_value(role).unwrap(), role.as_str());
        }
        for level in [PermissionLevel::ReadOnly, PermissionLevel::ReadWrite, PermissionLevel::Moderator] {
            assert_eq!(PermissionLevel::parse(level.as_str()), Some(level));
            assert_eq!(serde_json::to_value(level).unwrap(), level.as_str());
        }
        assert_eq!(ChannelType::parse("group"), None);
    }

    #[test]
    fn test_write_levels() {
        assert!(!PermissionLevel::ReadOnly.can_write());
        assert!(PermissionLevel::ReadWrite.can_write());
        assert!(PermissionLevel::Moderator.can_write());
    }
}
