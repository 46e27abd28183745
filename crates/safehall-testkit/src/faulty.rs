//! A backend wrapper with switchable failures.
//!
//! Used to check that incident-write failures surface to the caller and that
//! audit failures do not.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use safehall_core::{ChannelId, EmergencyIncident, IncidentId, IncidentStatus, PrincipalId};
use safehall_policy::{Channel, ParticipantGrant, Principal};
use safehall_store::{
    AppendResult, AuditEntry, AuditLog, ChannelStore, IncidentStore, KeyDirectory, Result, StoreError, StoredMessage,
};

/// Delegates to `inner` unless a failure switch is on.
pub struct FaultyStore<S> {
    inner: S,
    fail_incidents: AtomicBool,
    fail_audit: AtomicBool,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_incidents: AtomicBool::new(false),
            fail_audit: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make `create_incident` fail.
    pub fn fail_incidents(&self, on: bool) {
        self.fail_incidents.store(on, Ordering::SeqCst);
    }

    /// Make audit `append` fail.
    pub fn fail_audit(&self, on: bool) {
        self.fail_audit.store(on, Ordering::SeqCst);
    }

    fn injected(what: &str) -> StoreError {
        StoreError::InvalidData(format!("injected {what} failure"))
    }
}

#[async_trait]
impl<S: KeyDirectory> KeyDirectory for FaultyStore<S> {
    async fn lookup_public_key(&self, principal: &PrincipalId) -> Result<Option<String>> {
        self.inner.lookup_public_key(principal).await
    }

    async fn publish_public_key(&self, principal: &PrincipalId, pem: &str) -> Result<()> {
        self.inner.publish_public_key(principal, pem).await
    }
}

#[async_trait]
impl<S: ChannelStore> ChannelStore for FaultyStore<S> {
    async fn put_principal(&self, principal: &Principal) -> Result<()> {
        self.inner.put_principal(principal).await
    }

    async fn get_principal(&self, id: &PrincipalId) -> Result<Option<Principal>> {
        self.inner.get_principal(id).await
    }

    async fn insert_channel(&self, channel: &Channel, grants: &[ParticipantGrant]) -> Result<()> {
        self.inner.insert_channel(channel, grants).await
    }

    async fn get_channel(&self, id: &ChannelId) -> Result<Option<Channel>> {
        self.inner.get_channel(id).await
    }

    async fn add_grant(&self, grant: &ParticipantGrant) -> Result<()> {
        self.inner.add_grant(grant).await
    }

    async fn get_active_grant(&self, principal: &PrincipalId, channel: &ChannelId) -> Result<Option<ParticipantGrant>> {
        self.inner.get_active_grant(principal, channel).await
    }

    async fn grants_for_channel(&self, channel: &ChannelId) -> Result<Vec<ParticipantGrant>> {
        self.inner.grants_for_channel(channel).await
    }

    async fn active_grants_for(&self, principal: &PrincipalId) -> Result<Vec<ParticipantGrant>> {
        self.inner.active_grants_for(principal).await
    }

    async fn terminate_grant(&self, principal: &PrincipalId, channel: &ChannelId, at: i64) -> Result<bool> {
        self.inner.terminate_grant(principal, channel, at).await
    }

    async fn terminate_all_grants(&self, principal: &PrincipalId, at: i64) -> Result<Vec<ChannelId>> {
        self.inner.terminate_all_grants(principal, at).await
    }

    async fn append_message(&self, message: &StoredMessage) -> Result<AppendResult> {
        self.inner.append_message(message).await
    }

    async fn messages(&self, channel: &ChannelId) -> Result<Vec<StoredMessage>> {
        self.inner.messages(channel).await
    }
}

#[async_trait]
impl<S: IncidentStore> IncidentStore for FaultyStore<S> {
    async fn create_incident(&self, incident: &EmergencyIncident) -> Result<IncidentId> {
        if self.fail_incidents.load(Ordering::SeqCst) {
            return Err(Self::injected("incident"));
        }
        self.inner.create_incident(incident).await
    }

    async fn get_incident(&self, id: &IncidentId) -> Result<Option<EmergencyIncident>> {
        self.inner.get_incident(id).await
    }

    async fn advance_incident(&self, id: &IncidentId, to: IncidentStatus) -> Result<IncidentStatus> {
        self.inner.advance_incident(id, to).await
    }

    async fn incidents(&self) -> Result<Vec<(IncidentId, EmergencyIncident)>> {
        self.inner.incidents().await
    }
}

#[async_trait]
impl<S: AuditLog> AuditLog for FaultyStore<S> {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(Self::injected("audit"));
        }
        self.inner.append(entry).await
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>> {
        self.inner.entries().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safehall_store::MemoryStore;

    #[tokio::test]
    async fn test_switches_toggle_failures() {
        let store = FaultyStore::new(MemoryStore::new());
        let incident = EmergencyIncident::safety_button(PrincipalId::new("s1"), "help", 0);

        store.fail_incidents(true);
        assert!(store.create_incident(&incident).await.is_err());
        assert!(store.incidents().await.unwrap().is_empty());

        store.fail_incidents(false);
        assert!(store.create_incident(&incident).await.is_ok());
    }
}
