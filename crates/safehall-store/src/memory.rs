//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use safehall_core::{ChannelId, EmergencyIncident, IncidentId, IncidentStatus, PrincipalId};
use safehall_policy::{Channel, ParticipantGrant, Principal};

use crate::error::{Result, StoreError};
use crate::records::{AppendResult, AuditEntry, StoredMessage};
use crate::traits::{AuditLog, ChannelStore, IncidentStore, KeyDirectory};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// compound operation holds the write lock for its whole duration.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    keys: HashMap<PrincipalId, String>,
    principals: HashMap<PrincipalId, Principal>,
    channels: HashMap<ChannelId, Channel>,
    /// Keyed by (channel, principal).
    grants: BTreeMap<(ChannelId, PrincipalId), ParticipantGrant>,
    messages: Vec<StoredMessage>,
    /// Creation order.
    incidents: Vec<(IncidentId, EmergencyIncident)>,
    audit: Vec<AuditEntry>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn grant_key(principal: &PrincipalId, channel: &ChannelId) -> (ChannelId, PrincipalId) {
        (channel.clone(), principal.clone())
    }

    fn check_new_grant(&self, channel: &Channel, grant: &ParticipantGrant) -> Result<()> {
        if grant.channel_id() != &channel.id {
            return Err(StoreError::InvalidData(format!(
                "grant for {} does not belong to channel {}",
                grant.channel_id(),
                channel.id
            )));
        }
        let principal = self
            .principals
            .get(grant.principal())
            .ok_or_else(|| StoreError::NotFound(format!("principal {}", grant.principal())))?;
        if principal.org_id != channel.org_id {
            return Err(StoreError::InvalidData(format!(
                "{} belongs to {}, channel {} to {}",
                principal.id, principal.org_id, channel.id, channel.org_id
            )));
        }
        if self.grants.contains_key(&Self::grant_key(grant.principal(), grant.channel_id())) {
            return Err(StoreError::InvalidData(format!(
                "{} already has a grant on {}",
                grant.principal(),
                channel.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyDirectory for MemoryStore {
    async fn lookup_public_key(&self, principal: &PrincipalId) -> Result<Option<String>> {
        Ok(self.read()?.keys.get(principal).cloned())
    }

    async fn publish_public_key(&self, principal: &PrincipalId, pem: &str) -> Result<()> {
        self.write()?.keys.insert(principal.clone(), pem.to_owned());
        Ok(())
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn put_principal(&self, principal: &Principal) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.principals.get(&principal.id) {
            let holds_grants = inner.grants.keys().any(|(_, p)| p == &principal.id);
            if existing.org_id != principal.org_id && holds_grants {
                return Err(StoreError::InvalidData(format!(
                    "{} holds grants in {} and cannot move to {}",
                    principal.id, existing.org_id, principal.org_id
                )));
            }
        }
        inner.principals.insert(principal.id.clone(), principal.clone());
        Ok(())
    }

    async fn get_principal(&self, id: &PrincipalId) -> Result<Option<Principal>> {
        Ok(self.read()?.principals.get(id).cloned())
    }

    async fn insert_channel(&self, channel: &Channel, grants: &[ParticipantGrant]) -> Result<()> {
        let mut inner = self.write()?;

        if inner.channels.contains_key(&channel.id) {
            return Err(StoreError::InvalidData(format!("channel {} already exists", channel.id)));
        }
        for grant in grants {
            inner.check_new_grant(channel, grant)?;
        }

        inner.channels.insert(channel.id.clone(), channel.clone());
        for grant in grants {
            let key = MemoryStoreInner::grant_key(grant.principal(), grant.channel_id());
            inner.grants.insert(key, grant.clone());
        }
        Ok(())
    }

    async fn get_channel(&self, id: &ChannelId) -> Result<Option<Channel>> {
        Ok(self.read()?.channels.get(id).cloned())
    }

    async fn add_grant(&self, grant: &ParticipantGrant) -> Result<()> {
        let mut inner = self.write()?;
        let channel = inner
            .channels
            .get(grant.channel_id())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("channel {}", grant.channel_id())))?;
        inner.check_new_grant(&channel, grant)?;

        let key = MemoryStoreInner::grant_key(grant.principal(), grant.channel_id());
        inner.grants.insert(key, grant.clone());
        Ok(())
    }

    async fn get_active_grant(&self, principal: &PrincipalId, channel: &ChannelId) -> Result<Option<ParticipantGrant>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .get(&MemoryStoreInner::grant_key(principal, channel))
            .filter(|g| g.is_active())
            .cloned())
    }

    async fn grants_for_channel(&self, channel: &ChannelId) -> Result<Vec<ParticipantGrant>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .values()
            .filter(|g| g.channel_id() == channel)
            .cloned()
            .collect())
    }

    async fn active_grants_for(&self, principal: &PrincipalId) -> Result<Vec<ParticipantGrant>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .values()
            .filter(|g| g.principal() == principal && g.is_active())
            .cloned()
            .collect())
    }

    async fn terminate_grant(&self, principal: &PrincipalId, channel: &ChannelId, at: i64) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner
            .grants
            .get_mut(&MemoryStoreInner::grant_key(principal, channel))
            .map(|g| g.terminate(at))
            .unwrap_or(false))
    }

    async fn terminate_all_grants(&self, principal: &PrincipalId, at: i64) -> Result<Vec<ChannelId>> {
        let mut inner = self.write()?;
        Ok(inner
            .grants
            .values_mut()
            .filter(|g| g.principal() == principal)
            .filter_map(|g| g.terminate(at).then(|| g.channel_id().clone()))
            .collect())
    }

    async fn append_message(&self, message: &StoredMessage) -> Result<AppendResult> {
        let mut inner = self.write()?;

        let channel = inner
            .channels
            .get(&message.channel_id)
            .ok_or_else(|| StoreError::NotFound(format!("channel {}", message.channel_id)))?;
        if channel.mode != message.body.mode() {
            return Err(StoreError::InvalidData(format!(
                "{} body on {} channel {}",
                message.body.mode(),
                channel.mode,
                channel.id
            )));
        }

        let grant = inner
            .grants
            .get(&MemoryStoreInner::grant_key(&message.sender, &message.channel_id));
        if let Some(reason) = AppendResult::check_grant(grant) {
            return Ok(AppendResult::Denied(reason));
        }

        inner.messages.push(message.clone());
        Ok(AppendResult::Appended)
    }

    async fn messages(&self, channel: &ChannelId) -> Result<Vec<StoredMessage>> {
        let inner = self.read()?;
        Ok(inner
            .messages
            .iter()
            .filter(|m| &m.channel_id == channel)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn create_incident(&self, incident: &EmergencyIncident) -> Result<IncidentId> {
        let id = IncidentId::generate();
        self.write()?.incidents.push((id.clone(), incident.clone()));
        Ok(id)
    }

    async fn get_incident(&self, id: &IncidentId) -> Result<Option<EmergencyIncident>> {
        let inner = self.read()?;
        Ok(inner
            .incidents
            .iter()
            .find(|(iid, _)| iid == id)
            .map(|(_, incident)| incident.clone()))
    }

    async fn advance_incident(&self, id: &IncidentId, to: IncidentStatus) -> Result<IncidentStatus> {
        let mut inner = self.write()?;
        let incident = inner
            .incidents
            .iter_mut()
            .find(|(iid, _)| iid == id)
            .map(|(_, incident)| incident)
            .ok_or_else(|| StoreError::NotFound(format!("incident {id}")))?;

        let from = incident.status;
        incident.advance(to)?;
        Ok(from)
    }

    async fn incidents(&self) -> Result<Vec<(IncidentId, EmergencyIncident)>> {
        Ok(self.read()?.incidents.clone())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.write()?.audit.push(entry.clone());
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.read()?.audit.clone())
    }
}
