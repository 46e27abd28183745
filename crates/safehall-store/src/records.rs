//! Persisted records: messages and audit events.

use serde::{Deserialize, Serialize};

use safehall_cipher::EncryptedEnvelope;
use safehall_core::{ChannelId, IncidentId, IncidentStatus, MessageId, PrincipalId, RiskLevel, Severity};
use safehall_policy::{ChannelMode, ChannelType, DeniedReason, MessageKind, ParticipantGrant, PermissionLevel};
use safehall_safety::ContentAssessment;

/// A message body. The variant is fixed by the channel's mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MessageBody {
    /// Plaintext, readable by moderators.
    Moderated { text: String },
    /// End-to-end encrypted for the other participant.
    Encrypted { envelope: EncryptedEnvelope },
}

/// A message as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub sender: PrincipalId,
    pub kind: MessageKind,
    pub body: MessageBody,
    pub assessment: ContentAssessment,
    /// Unix milliseconds.
    pub sent_at: i64,
}

impl MessageBody {
    /// The channel mode this body belongs to.
    pub fn mode(&self) -> ChannelMode {
        match self {
            MessageBody::Moderated { .. } => ChannelMode::Moderated,
            MessageBody::Encrypted { .. } => ChannelMode::Encrypted,
        }
    }
}

/// Result of appending a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    /// Written.
    Appended,
    /// The sender's grant did not permit writing at append time.
    Denied(DeniedReason),
}

impl AppendResult {
    /// Re-check the sender's current grant (active or not).
    pub(crate) fn check_grant(grant: Option<&ParticipantGrant>) -> Option<DeniedReason> {
        match grant {
            None => Some(DeniedReason::NotParticipant),
            Some(g) if !g.is_active() => Some(DeniedReason::GrantTerminated),
            Some(g) if !g.permission_level().can_write() => Some(DeniedReason::ReadOnly),
            Some(_) => None,
        }
    }
}

/// One audit event. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    MessageSent {
        channel_id: ChannelId,
        message_id: MessageId,
        sender: PrincipalId,
        risk_level: RiskLevel,
    },
    MessageDenied {
        channel_id: ChannelId,
        principal: PrincipalId,
        reason: DeniedReason,
    },
    SignatureRejected {
        sender: PrincipalId,
        recipient: PrincipalId,
    },
    IncidentCreated {
        incident_id: IncidentId,
        severity: Severity,
        kind: String,
    },
    IncidentAdvanced {
        incident_id: IncidentId,
        from: IncidentStatus,
        to: IncidentStatus,
    },
    GrantsTerminated {
        principal: PrincipalId,
        channels: Vec<ChannelId>,
    },
    ChannelCreated {
        channel_id: ChannelId,
        channel_type: ChannelType,
        created_by: PrincipalId,
    },
    GrantIssued {
        channel_id: ChannelId,
        principal: PrincipalId,
        permission_level: PermissionLevel,
    },
}

/// An audit event with its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unix milliseconds.
    pub recorded_at: i64,
    pub event: AuditEvent,
}

impl AuditEntry {
    pub fn new(recorded_at: i64, event: AuditEvent) -> Self {
        Self { recorded_at, event }
    }
}
