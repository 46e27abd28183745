//! Escalation: turning safety signals into incidents and channel shutdowns.
//!
//! Two triggers exist:
//!
//! - A message whose assessment is critical files one `ContentViolation`
//!   incident against its sender.
//! - An emergency trigger (the safety button) files a `SafetyButton`
//!   incident and then terminates every active grant of the principal who
//!   pressed it.
//!
//! The incident is always written first. If that write fails nothing else
//! happens and the error reaches the caller: a safety signal must never be
//! dropped silently.

use std::sync::Arc;

use safehall_core::{ChannelId, Clock, EmergencyIncident, IncidentId, PrincipalId};
use safehall_store::{AuditEvent, Backend, StoredMessage};

use crate::audit::Auditor;
use crate::error::Result;

/// What an emergency trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyOutcome {
    /// The incident filed for the trigger.
    pub incident_id: IncidentId,
    /// Channels whose grants this trigger ended.
    pub terminated: Vec<ChannelId>,
}

/// Links content assessments and emergency triggers to the incident store
/// and to grant termination.
pub struct EscalationCoordinator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    audit: Auditor<S>,
}

impl<S: Backend> EscalationCoordinator<S> {
    /// Create a coordinator over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, audit: bool) -> Self {
        let auditor = Auditor::new(store.clone(), clock.clone(), audit);
        Self {
            store,
            clock,
            audit: auditor,
        }
    }

    /// Inspect a stored message's assessment.
    ///
    /// Files exactly one incident when the risk is critical and returns its
    /// id. Anything below critical is left to moderators reading the channel.
    pub async fn on_message_analyzed(&self, message: &StoredMessage) -> Result<Option<IncidentId>> {
        let assessment = &message.assessment;
        if !assessment.is_critical() {
            return Ok(None);
        }

        let incident = EmergencyIncident::content_violation(
            message.sender.clone(),
            message.channel_id.clone(),
            message.id.clone(),
            assessment.flagged_terms.iter().cloned().collect(),
            assessment.risk_level,
            self.clock.now_millis(),
        );
        let incident_id = self.file(&incident).await?;

        tracing::warn!(
            incident = %incident_id,
            channel = %message.channel_id,
            sender = %message.sender,
            self_harm = assessment.self_harm_signal,
            "critical content escalated"
        );
        Ok(Some(incident_id))
    }

    /// Handle a safety-button press by `principal`.
    ///
    /// Files a critical incident, then ends all of the principal's active
    /// grants in one atomic step. A second trigger files a second incident
    /// and terminates nothing new.
    pub async fn on_emergency_trigger(&self, principal: &PrincipalId, description: &str) -> Result<EmergencyOutcome> {
        let now = self.clock.now_millis();
        let incident = EmergencyIncident::safety_button(principal.clone(), description, now);
        let incident_id = self.file(&incident).await?;

        let terminated = self.store.terminate_all_grants(principal, now).await?;
        tracing::warn!(
            incident = %incident_id,
            principal = %principal,
            channels = terminated.len(),
            "emergency trigger: grants terminated"
        );

        self.audit
            .record(AuditEvent::GrantsTerminated {
                principal: principal.clone(),
                channels: terminated.clone(),
            })
            .await;

        Ok(EmergencyOutcome {
            incident_id,
            terminated,
        })
    }

    /// File a manual concern. Concerns never terminate grants.
    pub async fn on_concern(
        &self,
        reporter: &PrincipalId,
        subject: Option<&PrincipalId>,
        category: &str,
        description: &str,
    ) -> Result<IncidentId> {
        let incident = EmergencyIncident::concern(
            reporter.clone(),
            subject.cloned(),
            category,
            description,
            self.clock.now_millis(),
        );
        let incident_id = self.file(&incident).await?;
        tracing::info!(incident = %incident_id, reporter = %reporter, category, "concern filed");
        Ok(incident_id)
    }

    async fn file(&self, incident: &EmergencyIncident) -> Result<IncidentId> {
        let incident_id = self.store.create_incident(incident).await?;
        self.audit
            .record(AuditEvent::IncidentCreated {
                incident_id: incident_id.clone(),
                severity: incident.severity,
                kind: incident.kind.tag().to_owned(),
            })
            .await;
        Ok(incident_id)
    }
}
