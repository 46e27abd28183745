//! The Messenger: the API the rest of the platform talks to.
//!
//! A Messenger acts for one local principal, whose key pair it holds. It
//! gates, analyzes, encrypts, persists, and escalates, delegating storage to
//! a [`Backend`].

use std::sync::Arc;

use safehall_cipher::{EncryptedEnvelope, HybridCipher};
use safehall_core::{
    ChannelId, Clock, CryptoError, Fingerprint, IncidentId, IncidentStatus, KeyPair, MessageId, PrincipalId, PublicKey,
    SystemClock,
};
use safehall_policy::{
    AccessPolicy, Channel, ChannelMode, ChannelType, Decision, DeniedReason, MessageKind, ParticipantGrant,
    PermissionLevel, Principal, Role,
};
use safehall_safety::{ContentAnalyzer, ContentAssessment};
use safehall_store::{AppendResult, AuditEvent, Backend, MessageBody, StoredMessage};

use crate::audit::Auditor;
use crate::config::MessengerConfig;
use crate::error::{MessengerError, Result};
use crate::escalation::EscalationCoordinator;

/// Result of [`Messenger::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The message was stored.
    Delivered {
        message_id: MessageId,
        assessment: ContentAssessment,
        /// Set when the message was critical and an incident was filed.
        incident: Option<IncidentId>,
    },
    /// The policy refused the message. Nothing was stored.
    Denied(DeniedReason),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }

    pub fn denied_reason(&self) -> Option<DeniedReason> {
        match self {
            SendOutcome::Denied(reason) => Some(*reason),
            SendOutcome::Delivered { .. } => None,
        }
    }
}

/// Generate a key pair on the blocking pool.
///
/// Nothing is persisted; call [`Messenger::publish_identity`] once the pair
/// is bound to a Messenger.
pub async fn generate_key_pair_async() -> Result<KeyPair> {
    blocking(KeyPair::generate).await
}

/// Run an RSA operation off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, CryptoError> + Send + 'static,
    T: Send + 'static,
{
    let out = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MessengerError::Task(e.to_string()))?;
    Ok(out?)
}

/// Secure messaging for one local principal.
pub struct Messenger<S: Backend> {
    principal: Principal,
    key_pair: Arc<KeyPair>,
    store: Arc<S>,
    config: MessengerConfig,
    clock: Arc<dyn Clock>,
    analyzer: ContentAnalyzer,
    policy: AccessPolicy,
    coordinator: EscalationCoordinator<S>,
    audit: Auditor<S>,
}

impl<S: Backend> Messenger<S> {
    /// Create a Messenger on the system clock.
    pub fn new(store: Arc<S>, principal: Principal, key_pair: KeyPair, config: MessengerConfig) -> Result<Self> {
        Self::with_clock(store, principal, key_pair, config, Arc::new(SystemClock))
    }

    /// Create a Messenger with an explicit clock.
    ///
    /// Fails if the configured lexicon does not compile.
    pub fn with_clock(
        store: Arc<S>,
        principal: Principal,
        key_pair: KeyPair,
        config: MessengerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let analyzer = ContentAnalyzer::new(config.lexicon.clone())?;
        let policy = AccessPolicy::new(config.office_hours.clone());
        let coordinator = EscalationCoordinator::new(store.clone(), clock.clone(), config.audit);
        let audit = Auditor::new(store.clone(), clock.clone(), config.audit);

        Ok(Self {
            principal,
            key_pair: Arc::new(key_pair),
            store,
            config,
            clock,
            analyzer,
            policy,
            coordinator,
            audit,
        })
    }

    /// The local principal.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Fingerprint of the local public key.
    pub fn fingerprint(&self) -> &Fingerprint {
        self.key_pair.fingerprint()
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn coordinator(&self) -> &EscalationCoordinator<S> {
        &self.coordinator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    /// Register the local principal and publish its public key.
    ///
    /// Must happen before the principal can be granted into channels or
    /// receive encrypted messages.
    pub async fn publish_identity(&self) -> Result<()> {
        let pem = self.key_pair.public_key().to_pem()?;
        self.store.put_principal(&self.principal).await?;
        self.store.publish_public_key(&self.principal.id, &pem).await?;

        tracing::info!(
            principal = %self.principal.id,
            fingerprint = %self.key_pair.fingerprint(),
            "identity published"
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Policy
    // ─────────────────────────────────────────────────────────────────────────

    /// May `principal` send a text message on `channel` right now?
    pub async fn can_send(&self, principal: &PrincipalId, channel: &ChannelId) -> Result<Decision> {
        self.can_send_kind(principal, channel, MessageKind::Text).await
    }

    /// May `principal` send a `kind` message on `channel` right now?
    pub async fn can_send_kind(&self, principal: &PrincipalId, channel: &ChannelId, kind: MessageKind) -> Result<Decision> {
        let principal = self.load_principal(principal).await?;
        let channel = self.load_channel(channel).await?;
        self.send_decision(&principal, &channel, kind).await
    }

    /// Score text without sending it.
    pub fn analyze(&self, text: &str) -> ContentAssessment {
        self.analyzer.analyze(text)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Messaging
    // ─────────────────────────────────────────────────────────────────────────

    /// Send `text` on a channel as the local principal.
    ///
    /// The flow is: policy gate, analysis, encryption when the channel is
    /// encrypted, append (which re-checks the grant), then escalation. If the
    /// message is critical and its incident cannot be filed, this returns an
    /// error even though the message was stored.
    pub async fn send(&self, channel: &ChannelId, text: &str, kind: MessageKind) -> Result<SendOutcome> {
        let channel = self.load_channel(channel).await?;

        if let Decision::Deny(reason) = self.send_decision(&self.principal, &channel, kind).await? {
            return Ok(self.denied(&channel.id, reason).await);
        }

        let assessment = self.analyzer.analyze(text);
        let body = match channel.mode {
            ChannelMode::Moderated => MessageBody::Moderated { text: text.to_owned() },
            ChannelMode::Encrypted => MessageBody::Encrypted {
                envelope: self.encrypt_for(&channel, text).await?,
            },
        };

        let message = StoredMessage {
            id: MessageId::generate(),
            channel_id: channel.id.clone(),
            sender: self.principal.id.clone(),
            kind,
            body,
            assessment,
            sent_at: self.clock.now_millis(),
        };

        if let AppendResult::Denied(reason) = self.store.append_message(&message).await? {
            return Ok(self.denied(&channel.id, reason).await);
        }

        tracing::debug!(
            message = %message.id,
            channel = %channel.id,
            risk = %message.assessment.risk_level,
            "message stored"
        );
        self.audit
            .record(AuditEvent::MessageSent {
                channel_id: channel.id.clone(),
                message_id: message.id.clone(),
                sender: self.principal.id.clone(),
                risk_level: message.assessment.risk_level,
            })
            .await;

        let incident = self.coordinator.on_message_analyzed(&message).await?;

        Ok(SendOutcome::Delivered {
            message_id: message.id,
            assessment: message.assessment,
            incident,
        })
    }

    /// Encrypt `plaintext` for the other participant of an encrypted direct
    /// channel, signed with the local key.
    pub async fn encrypt_for_channel(&self, plaintext: &str, channel: &ChannelId) -> Result<EncryptedEnvelope> {
        let channel = self.load_channel(channel).await?;
        self.encrypt_for(&channel, plaintext).await
    }

    /// Verify and decrypt an envelope sent by `sender` to the local principal.
    pub async fn decrypt_from(&self, sender: &PrincipalId, envelope: &EncryptedEnvelope) -> Result<String> {
        let sender_key = self.public_key_of(sender).await?;
        let key_pair = self.key_pair.clone();
        let envelope = envelope.clone();

        let result = blocking(move || HybridCipher::decrypt_text(&envelope, key_pair.private_key(), &sender_key)).await;

        if let Err(MessengerError::Crypto(e)) = &result {
            if e.is_hostile() {
                tracing::warn!(sender = %sender, recipient = %self.principal.id, error = %e, "hostile envelope rejected");
            }
            if *e == CryptoError::SignatureInvalid {
                self.audit
                    .record(AuditEvent::SignatureRejected {
                        sender: sender.clone(),
                        recipient: self.principal.id.clone(),
                    })
                    .await;
            }
        }
        result
    }

    /// Messages on a channel the local principal participates in.
    pub async fn read_channel(&self, channel: &ChannelId) -> Result<Vec<StoredMessage>> {
        let channel = self.load_channel(channel).await?;
        let grant = self.store.get_active_grant(&self.principal.id, &channel.id).await?;
        self.policy
            .can_access_channel(self.principal.role, channel.channel_type, grant.is_some())
            .into_result()?;
        Ok(self.store.messages(&channel.id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Channels
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a channel owned by the local principal.
    ///
    /// The creator is granted automatically: read-write on direct channels,
    /// moderator otherwise. A direct channel takes exactly one peer, who must
    /// be an allowed conversation partner.
    pub async fn create_channel(
        &self,
        channel_type: ChannelType,
        mode: ChannelMode,
        participants: &[(PrincipalId, PermissionLevel)],
    ) -> Result<Channel> {
        self.policy
            .can_create_channel(self.principal.role, channel_type)
            .into_result()?;

        let channel = Channel::new(
            ChannelId::generate(),
            channel_type,
            mode,
            self.principal.org_id.clone(),
            self.principal.id.clone(),
        )?;

        let direct = channel_type == ChannelType::Direct;
        if direct && participants.len() != 1 {
            return Err(MessengerError::InvalidParticipants(format!(
                "a direct channel takes exactly one peer, got {}",
                participants.len()
            )));
        }

        let now = self.clock.now_millis();
        let creator_level = if direct {
            PermissionLevel::ReadWrite
        } else {
            PermissionLevel::Moderator
        };
        let mut grants = vec![ParticipantGrant::issue(&self.principal, &channel, creator_level, now)?];

        for (id, level) in participants {
            if id == &self.principal.id || grants.iter().any(|g| g.principal() == id) {
                return Err(MessengerError::InvalidParticipants(format!("{id} listed twice")));
            }
            let peer = self.load_principal(id).await?;
            if direct {
                self.policy.can_message_peer(&self.principal, &peer).into_result()?;
            }
            grants.push(ParticipantGrant::issue(&peer, &channel, *level, now)?);
        }

        self.store.insert_channel(&channel, &grants).await?;
        tracing::info!(
            channel = %channel.id,
            channel_type = %channel.channel_type,
            mode = %channel.mode,
            participants = grants.len(),
            "channel created"
        );

        self.audit
            .record(AuditEvent::ChannelCreated {
                channel_id: channel.id.clone(),
                channel_type,
                created_by: self.principal.id.clone(),
            })
            .await;
        for grant in &grants {
            self.record_grant(grant).await;
        }

        Ok(channel)
    }

    /// Add a participant to a group channel the local principal moderates.
    pub async fn add_participant(&self, channel: &ChannelId, principal: &PrincipalId, level: PermissionLevel) -> Result<()> {
        let channel = self.load_channel(channel).await?;
        if channel.channel_type == ChannelType::Direct {
            return Err(MessengerError::InvalidParticipants(
                "direct channels cannot gain participants".into(),
            ));
        }

        let own = self
            .store
            .get_active_grant(&self.principal.id, &channel.id)
            .await?
            .ok_or(DeniedReason::NotParticipant)?;
        if own.permission_level() != PermissionLevel::Moderator {
            return Err(DeniedReason::Role.into());
        }

        let peer = self.load_principal(principal).await?;
        let grant = ParticipantGrant::issue(&peer, &channel, level, self.clock.now_millis())?;
        self.store.add_grant(&grant).await?;
        self.record_grant(&grant).await;
        Ok(())
    }

    /// End the local principal's grant on a channel.
    ///
    /// Returns whether this call ended it. Leaving is permanent.
    pub async fn leave_channel(&self, channel: &ChannelId) -> Result<bool> {
        let left = self
            .store
            .terminate_grant(&self.principal.id, channel, self.clock.now_millis())
            .await?;
        if left {
            tracing::info!(principal = %self.principal.id, channel = %channel, "left channel");
        }
        Ok(left)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Incidents
    // ─────────────────────────────────────────────────────────────────────────

    /// Safety button: file a critical incident for `principal` and cut them
    /// out of every channel.
    pub async fn report_emergency(&self, principal: &PrincipalId, description: &str) -> Result<IncidentId> {
        let principal = self.load_principal(principal).await?;
        self.policy.can_report_incident(principal.role).into_result()?;

        let outcome = self.coordinator.on_emergency_trigger(&principal.id, description).await?;
        Ok(outcome.incident_id)
    }

    /// File a concern as the local principal, optionally about `subject`.
    pub async fn report_concern(&self, subject: Option<&PrincipalId>, category: &str, description: &str) -> Result<IncidentId> {
        self.policy.can_report_incident(self.principal.role).into_result()?;
        self.coordinator
            .on_concern(&self.principal.id, subject, category, description)
            .await
    }

    /// Move an incident through moderation. Teachers and admins only.
    ///
    /// Returns the previous status.
    pub async fn advance_incident(&self, incident: &IncidentId, to: IncidentStatus) -> Result<IncidentStatus> {
        if !matches!(self.principal.role, Role::Teacher | Role::Admin) {
            return Err(DeniedReason::Role.into());
        }

        let from = self.store.advance_incident(incident, to).await?;
        tracing::info!(incident = %incident, %from, %to, "incident advanced");
        self.audit
            .record(AuditEvent::IncidentAdvanced {
                incident_id: incident.clone(),
                from,
                to,
            })
            .await;
        Ok(from)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn load_channel(&self, id: &ChannelId) -> Result<Channel> {
        self.store
            .get_channel(id)
            .await?
            .ok_or_else(|| MessengerError::ChannelNotFound(id.clone()))
    }

    async fn load_principal(&self, id: &PrincipalId) -> Result<Principal> {
        self.store
            .get_principal(id)
            .await?
            .ok_or_else(|| MessengerError::PrincipalNotFound(id.clone()))
    }

    async fn public_key_of(&self, id: &PrincipalId) -> Result<PublicKey> {
        let pem = self
            .store
            .lookup_public_key(id)
            .await?
            .ok_or_else(|| MessengerError::PublicKeyNotFound(id.clone()))?;
        Ok(PublicKey::from_pem(&pem)?)
    }

    /// Evaluate the send policy against the principal's grant, active or not,
    /// so a terminated grant is reported as such.
    async fn send_decision(&self, principal: &Principal, channel: &Channel, kind: MessageKind) -> Result<Decision> {
        let grant = self
            .store
            .grants_for_channel(&channel.id)
            .await?
            .into_iter()
            .find(|g| g.principal() == &principal.id);
        Ok(self
            .policy
            .can_send_message(principal, channel, grant.as_ref(), kind, self.clock.now()))
    }

    /// The single other active participant of an encrypted channel.
    async fn recipient_of(&self, channel: &Channel) -> Result<PrincipalId> {
        let grants = self.store.grants_for_channel(&channel.id).await?;
        let mut others = grants
            .iter()
            .filter(|g| g.is_active() && g.principal() != &self.principal.id)
            .map(|g| g.principal().clone());

        match (others.next(), others.next()) {
            (Some(recipient), None) => Ok(recipient),
            (None, _) => Err(MessengerError::EncryptionUnavailable(format!(
                "channel {} has no active recipient",
                channel.id
            ))),
            (Some(_), Some(_)) => Err(MessengerError::EncryptionUnavailable(format!(
                "channel {} has more than one recipient",
                channel.id
            ))),
        }
    }

    async fn encrypt_for(&self, channel: &Channel, plaintext: &str) -> Result<EncryptedEnvelope> {
        if !channel.is_encrypted() {
            return Err(MessengerError::EncryptionUnavailable(format!(
                "channel {} is moderated",
                channel.id
            )));
        }

        let recipient = self.recipient_of(channel).await?;
        let recipient_key = self.public_key_of(&recipient).await?;
        let key_pair = self.key_pair.clone();
        let plaintext = plaintext.as_bytes().to_vec();

        blocking(move || HybridCipher::encrypt(&plaintext, &recipient_key, key_pair.private_key())).await
    }

    async fn denied(&self, channel: &ChannelId, reason: DeniedReason) -> SendOutcome {
        tracing::info!(principal = %self.principal.id, channel = %channel, %reason, "send denied");
        self.audit
            .record(AuditEvent::MessageDenied {
                channel_id: channel.clone(),
                principal: self.principal.id.clone(),
                reason,
            })
            .await;
        SendOutcome::Denied(reason)
    }

    async fn record_grant(&self, grant: &ParticipantGrant) {
        self.audit
            .record(AuditEvent::GrantIssued {
                channel_id: grant.channel_id().clone(),
                principal: grant.principal().clone(),
                permission_level: grant.permission_level(),
            })
            .await;
    }
}
