//! Collaborator interfaces consumed by the messaging core.
//!
//! The core is storage-agnostic. It talks to four narrow traits, and a
//! single backend usually implements all of them ([`Backend`]).

use async_trait::async_trait;

use safehall_core::{ChannelId, EmergencyIncident, IncidentId, IncidentStatus, PrincipalId};
use safehall_policy::{Channel, ParticipantGrant, Principal};

use crate::error::Result;
use crate::records::{AppendResult, AuditEntry, StoredMessage};

/// Public-key lookup.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// The principal's SPKI PEM, if published.
    async fn lookup_public_key(&self, principal: &PrincipalId) -> Result<Option<String>>;

    /// Publish or replace the principal's SPKI PEM.
    async fn publish_public_key(&self, principal: &PrincipalId, pem: &str) -> Result<()>;
}

/// Principals, channels, grants, and messages.
///
/// # Atomicity
///
/// - [`append_message`](Self::append_message) re-checks the sender's grant in
///   the same critical section that writes the message. A grant terminated
///   before the append is observed by it.
/// - [`terminate_all_grants`](Self::terminate_all_grants) ends every active
///   grant of a principal in one critical section.
/// - Terminating an already-terminated grant is a no-op.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Principals
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a principal.
    async fn put_principal(&self, principal: &Principal) -> Result<()>;

    async fn get_principal(&self, id: &PrincipalId) -> Result<Option<Principal>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Channels and grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a channel together with its initial grants.
    ///
    /// Fails if the channel exists, a grant names another channel, or a
    /// grantee is unknown.
    async fn insert_channel(&self, channel: &Channel, grants: &[ParticipantGrant]) -> Result<()>;

    async fn get_channel(&self, id: &ChannelId) -> Result<Option<Channel>>;

    /// Add a grant to an existing channel.
    ///
    /// A principal holds at most one grant per channel, ever: a terminated
    /// grant blocks re-adding.
    async fn add_grant(&self, grant: &ParticipantGrant) -> Result<()>;

    /// The principal's grant on the channel, if it is still active.
    async fn get_active_grant(&self, principal: &PrincipalId, channel: &ChannelId) -> Result<Option<ParticipantGrant>>;

    /// Every grant on the channel, active or not.
    async fn grants_for_channel(&self, channel: &ChannelId) -> Result<Vec<ParticipantGrant>>;

    /// The principal's active grants across all channels.
    async fn active_grants_for(&self, principal: &PrincipalId) -> Result<Vec<ParticipantGrant>>;

    /// Terminate one grant. Returns whether this call ended it.
    async fn terminate_grant(&self, principal: &PrincipalId, channel: &ChannelId, at: i64) -> Result<bool>;

    /// Terminate every active grant of `principal`.
    ///
    /// Returns the channels whose grants this call ended.
    async fn terminate_all_grants(&self, principal: &PrincipalId, at: i64) -> Result<Vec<ChannelId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a message if the sender's grant still permits writing.
    async fn append_message(&self, message: &StoredMessage) -> Result<AppendResult>;

    /// Messages on a channel in append order.
    async fn messages(&self, channel: &ChannelId) -> Result<Vec<StoredMessage>>;
}

/// Emergency incident persistence. Incidents are never deleted.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Persist a new incident and assign its id.
    async fn create_incident(&self, incident: &EmergencyIncident) -> Result<IncidentId>;

    async fn get_incident(&self, id: &IncidentId) -> Result<Option<EmergencyIncident>>;

    /// Move an incident to `to`. Returns the previous status.
    async fn advance_incident(&self, id: &IncidentId, to: IncidentStatus) -> Result<IncidentStatus>;

    /// All incidents in creation order.
    async fn incidents(&self) -> Result<Vec<(IncidentId, EmergencyIncident)>>;
}

/// Append-only audit trail. Callers treat failures as non-fatal.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// All entries in append order.
    async fn entries(&self) -> Result<Vec<AuditEntry>>;
}

/// Everything the messenger needs from storage.
pub trait Backend: KeyDirectory + ChannelStore + IncidentStore + AuditLog {}

impl<T: KeyDirectory + ChannelStore + IncidentStore + AuditLog> Backend for T {}
