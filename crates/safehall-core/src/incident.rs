//! Emergency incidents and their status machine.
//!
//! Incidents are created by the escalation coordinator and advanced only by
//! an external moderation workflow. They are never deleted.
//!
//! ```text
//! open ──► investigating ──┬──► resolved
//!                          └──► escalated
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IncidentError;
use crate::types::{ChannelId, MessageId, PrincipalId, RiskLevel};

/// How urgently an incident needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
    Escalated,
}

impl IncidentStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Escalated)
    }

    /// Whether `self -> to` is a legal edge.
    pub fn can_transition_to(&self, to: IncidentStatus) -> bool {
        matches!(
            (self, to),
            (IncidentStatus::Open, IncidentStatus::Investigating)
                | (IncidentStatus::Investigating, IncidentStatus::Resolved)
                | (IncidentStatus::Investigating, IncidentStatus::Escalated)
        )
    }

    /// Validate and return the target state.
    pub fn transition(self, to: IncidentStatus) -> Result<IncidentStatus, IncidentError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(IncidentError::InvalidTransition { from: self, to })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Escalated => "escalated",
        }
    }

    /// Parse the stable lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(IncidentStatus::Open),
            "investigating" => Some(IncidentStatus::Investigating),
            "resolved" => Some(IncidentStatus::Resolved),
            "escalated" => Some(IncidentStatus::Escalated),
            _ => None,
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who raised an incident.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Reporter {
    /// A human pressed a button or filed a concern.
    Principal(PrincipalId),
    /// Raised automatically by content analysis.
    System,
}

/// What happened. Each kind carries only the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncidentKind {
    /// The principal pressed the safety button.
    SafetyButton,
    /// A message was scored at high or critical risk.
    ContentViolation {
        channel_id: ChannelId,
        message_id: MessageId,
        flagged_terms: Vec<String>,
        risk_level: RiskLevel,
    },
    /// A manually filed concern.
    Concern { category: String },
}

impl IncidentKind {
    /// Severity assigned to incidents of this kind.
    pub fn severity(&self) -> Severity {
        match self {
            IncidentKind::SafetyButton => Severity::Critical,
            IncidentKind::ContentViolation { risk_level, .. } => {
                if *risk_level == RiskLevel::Critical {
                    Severity::Critical
                } else {
                    Severity::High
                }
            }
            IncidentKind::Concern { .. } => Severity::Medium,
        }
    }

    /// Stable lowercase tag.
    pub fn tag(&self) -> &'static str {
        match self {
            IncidentKind::SafetyButton => "safety_button",
            IncidentKind::ContentViolation { .. } => "content_violation",
            IncidentKind::Concern { .. } => "concern",
        }
    }
}

/// A safety incident awaiting moderation.
///
/// The identifier is not part of the record; it is assigned by the incident
/// store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyIncident {
    pub severity: Severity,
    pub kind: IncidentKind,
    pub reporter: Reporter,
    pub reported_subject: Option<PrincipalId>,
    pub description: String,
    pub status: IncidentStatus,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl EmergencyIncident {
    fn new(
        kind: IncidentKind,
        reporter: Reporter,
        reported_subject: Option<PrincipalId>,
        description: String,
        created_at: i64,
    ) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            reporter,
            reported_subject,
            description,
            status: IncidentStatus::Open,
            created_at,
        }
    }

    /// A safety-button press by `principal`.
    pub fn safety_button(principal: PrincipalId, description: impl Into<String>, created_at: i64) -> Self {
        Self::new(
            IncidentKind::SafetyButton,
            Reporter::Principal(principal),
            None,
            description.into(),
            created_at,
        )
    }

    /// An automatically flagged message from `sender`.
    ///
    /// The description is the comma-joined list of flagged terms.
    pub fn content_violation(
        sender: PrincipalId,
        channel_id: ChannelId,
        message_id: MessageId,
        flagged_terms: Vec<String>,
        risk_level: RiskLevel,
        created_at: i64,
    ) -> Self {
        let description = flagged_terms.join(", ");
        Self::new(
            IncidentKind::ContentViolation {
                channel_id,
                message_id,
                flagged_terms,
                risk_level,
            },
            Reporter::System,
            Some(sender),
            description,
            created_at,
        )
    }

    /// A manually filed concern about `subject`.
    pub fn concern(
        reporter: PrincipalId,
        subject: Option<PrincipalId>,
        category: impl Into<String>,
        description: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self::new(
            IncidentKind::Concern {
                category: category.into(),
            },
            Reporter::Principal(reporter),
            subject,
            description.into(),
            created_at,
        )
    }

    /// Move to `to`, or fail without changing state.
    pub fn advance(&mut self, to: IncidentStatus) -> Result<(), IncidentError> {
        self.status = self.status.transition(to)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [IncidentStatus; 4] = [
        IncidentStatus::Open,
        IncidentStatus::Investigating,
        IncidentStatus::Resolved,
        IncidentStatus::Escalated,
    ];

    #[test]
    fn test_transition_matrix() {
        use IncidentStatus::*;
        let allowed = [(Open, Investigating), (Investigating, Resolved), (Investigating, Escalated)];

        for from in ALL {
            for to in ALL {
                let result = from.transition(to);
                if allowed.contains(&(from, to)) {
                    assert_eq!(result, Ok(to));
                } else {
                    assert_eq!(result, Err(IncidentError::InvalidTransition { from, to }));
                }
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        for status in ALL {
            let has_exit = ALL.iter().any(|to| status.can_transition_to(*to));
            assert_eq!(status.is_terminal(), !has_exit, "{status}");
        }
    }

    #[test]
    fn test_severity_table() {
        assert_eq!(IncidentKind::SafetyButton.severity(), Severity::Critical);
        assert_eq!(
            IncidentKind::Concern { category: "bullying".into() }.severity(),
            Severity::Medium
        );

        let violation = |risk_level| IncidentKind::ContentViolation {
            channel_id: ChannelId::new("c"),
            message_id: MessageId::new("m"),
            flagged_terms: vec![],
            risk_level,
        };
        assert_eq!(violation(RiskLevel::Critical).severity(), Severity::Critical);
        assert_eq!(violation(RiskLevel::High).severity(), Severity::High);
    }

    #[test]
    fn test_content_violation_reporter_is_system() {
        let incident = EmergencyIncident::content_violation(
            PrincipalId::new("stu-1"),
            ChannelId::new("chan-1"),
            MessageId::new("msg-1"),
            vec!["gun".into(), "kill".into()],
            RiskLevel::Critical,
            0,
        );
        assert_eq!(incident.reporter, Reporter::System);
        assert_eq!(incident.reported_subject, Some(PrincipalId::new("stu-1")));
        assert_eq!(incident.severity, Severity::Critical);
        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(incident.description, "gun, kill");
    }

    #[test]
    fn test_advance_failure_leaves_status() {
        let mut incident = EmergencyIncident::safety_button(PrincipalId::new("p"), "help", 0);
        assert!(incident.advance(IncidentStatus::Resolved).is_err());
        assert_eq!(incident.status, IncidentStatus::Open);

        incident.advance(IncidentStatus::Investigating).unwrap();
        incident.advance(IncidentStatus::Escalated).unwrap();
        assert!(incident.advance(IncidentStatus::Resolved).is_err());
        assert_eq!(incident.status, IncidentStatus::Escalated);
    }

    #[test]
    fn test_kind_serializes_tagged() {
        let json = serde_json::to_value(IncidentKind::Concern { category: "x".into() }).unwrap();
        assert_eq!(json["type"], "concern");
        assert_eq!(json["category"], "x");

        let json = serde_json::to_value(Reporter::System).unwrap();
        assert_eq!(json["type"], "system");
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in ALL {
            assert_eq!(IncidentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(IncidentStatus::parse("closed"), None);
    }
}
