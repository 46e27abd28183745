//! SQLite implementation of the store traits.
//!
//! This is the persistent backend for single-node deployments. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.
//! Compound operations run inside one transaction while holding the
//! connection mutex.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use safehall_core::{ChannelId, EmergencyIncident, IncidentId, IncidentStatus, PrincipalId};
use safehall_policy::{Channel, ChannelMode, ChannelType, ParticipantGrant, PermissionLevel, Principal, Role};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::records::{AppendResult, AuditEntry, StoredMessage};
use crate::traits::{AuditLog, ChannelStore, IncidentStore, KeyDirectory};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the blocking pool with exclusive access to the connection.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn parse_column<T>(value: &str, parse: fn(&str) -> Option<T>, column: &str) -> Result<T> {
    parse(value).ok_or_else(|| StoreError::InvalidData(format!("bad {column}: {value}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

struct PrincipalRow {
    id: String,
    role: String,
    org_id: String,
    display_name: String,
}

impl PrincipalRow {
    fn read(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            role: row.get(offset + 1)?,
            org_id: row.get(offset + 2)?,
            display_name: row.get(offset + 3)?,
        })
    }

    fn into_principal(self) -> Result<Principal> {
        let role = parse_column(&self.role, Role::parse, "role")?;
        Ok(Principal::new(self.id, role, self.org_id, self.display_name))
    }
}

struct ChannelRow {
    id: String,
    channel_type: String,
    mode: String,
    org_id: String,
    created_by: String,
}

impl ChannelRow {
    fn read(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            channel_type: row.get(offset + 1)?,
            mode: row.get(offset + 2)?,
            org_id: row.get(offset + 3)?,
            created_by: row.get(offset + 4)?,
        })
    }

    fn into_channel(self) -> Result<Channel> {
        let channel_type = parse_column(&self.channel_type, ChannelType::parse, "channel_type")?;
        let mode = parse_column(&self.mode, ChannelMode::parse, "mode")?;
        Channel::new(self.id, channel_type, mode, self.org_id, self.created_by)
            .map_err(|e| StoreError::InvalidData(e.to_string()))
    }
}

struct GrantRow {
    permission_level: String,
    joined_at: i64,
    left_at: Option<i64>,
    principal: PrincipalRow,
    channel: ChannelRow,
}

impl GrantRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            permission_level: row.get(0)?,
            joined_at: row.get(1)?,
            left_at: row.get(2)?,
            principal: PrincipalRow::read(row, 3)?,
            channel: ChannelRow::read(row, 7)?,
        })
    }

    /// Rehydrate, re-checking the org invariant against the joined rows.
    fn into_grant(self) -> Result<ParticipantGrant> {
        let level = parse_column(&self.permission_level, PermissionLevel::parse, "permission_level")?;
        let principal = self.principal.into_principal()?;
        let channel = self.channel.into_channel()?;
        ParticipantGrant::restore(&principal, &channel, level, self.joined_at, self.left_at)
            .map_err(|reason| StoreError::InvalidData(format!("stored grant violates policy: {reason}")))
    }
}

const GRANT_SELECT: &str = "SELECT g.permission_level, g.joined_at, g.left_at, \
     p.id, p.role, p.org_id, p.display_name, \
     c.id, c.channel_type, c.mode, c.org_id, c.created_by \
     FROM grants g \
     JOIN principals p ON p.id = g.principal_id \
     JOIN channels c ON c.id = g.channel_id";

fn query_grants(conn: &Connection, filter: &str, params: impl rusqlite::Params) -> Result<Vec<ParticipantGrant>> {
    let sql = format!("{GRANT_SELECT} WHERE {filter} ORDER BY g.channel_id, g.principal_id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, GrantRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(GrantRow::into_grant).collect()
}

fn load_grant(conn: &Connection, principal: &str, channel: &str) -> Result<Option<ParticipantGrant>> {
    Ok(query_grants(conn, "g.principal_id = ?1 AND g.channel_id = ?2", params![principal, channel])?
        .into_iter()
        .next())
}

fn load_channel(conn: &Connection, id: &str) -> Result<Option<Channel>> {
    conn.query_row(
        "SELECT id, channel_type, mode, org_id, created_by FROM channels WHERE id = ?1",
        params![id],
        |row| ChannelRow::read(row, 0),
    )
    .optional()?
    .map(ChannelRow::into_channel)
    .transpose()
}

fn principal_org(conn: &Connection, id: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT org_id FROM principals WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?)
}

fn has_grants(conn: &Connection, principal: &str) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM grants WHERE principal_id = ?1 LIMIT 1", params![principal], |_| Ok(()))
        .optional()?
        .is_some())
}

fn insert_grant(conn: &Connection, channel: &Channel, grant: &ParticipantGrant) -> Result<()> {
    if grant.channel_id() != &channel.id {
        return Err(StoreError::InvalidData(format!(
            "grant for {} does not belong to channel {}",
            grant.channel_id(),
            channel.id
        )));
    }
    let org = principal_org(conn, grant.principal().as_str())?
        .ok_or_else(|| StoreError::NotFound(format!("principal {}", grant.principal())))?;
    if org != channel.org_id.as_str() {
        return Err(StoreError::InvalidData(format!(
            "{} belongs to {org}, channel {} to {}",
            grant.principal(),
            channel.id,
            channel.org_id
        )));
    }
    if load_grant(conn, grant.principal().as_str(), channel.id.as_str())?.is_some() {
        return Err(StoreError::InvalidData(format!(
            "{} already has a grant on {}",
            grant.principal(),
            channel.id
        )));
    }

    conn.execute(
        "INSERT INTO grants (channel_id, principal_id, permission_level, joined_at, left_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            channel.id.as_str(),
            grant.principal().as_str(),
            grant.permission_level().as_str(),
            grant.joined_at(),
            grant.left_at(),
        ],
    )?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait implementations
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl KeyDirectory for SqliteStore {
    async fn lookup_public_key(&self, principal: &PrincipalId) -> Result<Option<String>> {
        let principal = principal.clone();
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT pem FROM public_keys WHERE principal_id = ?1",
                    params![principal.as_str()],
                    |row| row.get(0),
                )
                .optional()?)
        })
        .await
    }

    async fn publish_public_key(&self, principal: &PrincipalId, pem: &str) -> Result<()> {
        let principal = principal.clone();
        let pem = pem.to_owned();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO public_keys (principal_id, pem) VALUES (?1, ?2)
                 ON CONFLICT(principal_id) DO UPDATE SET pem = excluded.pem",
                params![principal.as_str(), pem],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ChannelStore for SqliteStore {
    async fn put_principal(&self, principal: &Principal) -> Result<()> {
        let principal = principal.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            if let Some(org) = principal_org(&tx, principal.id.as_str())? {
                if org != principal.org_id.as_str() && has_grants(&tx, principal.id.as_str())? {
                    return Err(StoreError::InvalidData(format!(
                        "{} holds grants in {org} and cannot move to {}",
                        principal.id, principal.org_id
                    )));
                }
            }
            tx.execute(
                "INSERT INTO principals (id, role, org_id, display_name) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    role = excluded.role, org_id = excluded.org_id, display_name = excluded.display_name",
                params![
                    principal.id.as_str(),
                    principal.role.as_str(),
                    principal.org_id.as_str(),
                    principal.display_name,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_principal(&self, id: &PrincipalId) -> Result<Option<Principal>> {
        let id = id.clone();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, role, org_id, display_name FROM principals WHERE id = ?1",
                params![id.as_str()],
                |row| PrincipalRow::read(row, 0),
            )
            .optional()?
            .map(PrincipalRow::into_principal)
            .transpose()
        })
        .await
    }

    async fn insert_channel(&self, channel: &Channel, grants: &[ParticipantGrant]) -> Result<()> {
        let channel = channel.clone();
        let grants = grants.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            if load_channel(&tx, channel.id.as_str())?.is_some() {
                return Err(StoreError::InvalidData(format!("channel {} already exists", channel.id)));
            }
            tx.execute(
                "INSERT INTO channels (id, channel_type, mode, org_id, created_by) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    channel.id.as_str(),
                    channel.channel_type.as_str(),
                    channel.mode.as_str(),
                    channel.org_id.as_str(),
                    channel.created_by.as_str(),
                ],
            )?;
            for grant in &grants {
                insert_grant(&tx, &channel, grant)?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_channel(&self, id: &ChannelId) -> Result<Option<Channel>> {
        let id = id.clone();
        self.run(move |conn| load_channel(conn, id.as_str())).await
    }

    async fn add_grant(&self, grant: &ParticipantGrant) -> Result<()> {
        let grant = grant.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let channel = load_channel(&tx, grant.channel_id().as_str())?
                .ok_or_else(|| StoreError::NotFound(format!("channel {}", grant.channel_id())))?;
            insert_grant(&tx, &channel, &grant)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_active_grant(&self, principal: &PrincipalId, channel: &ChannelId) -> Result<Option<ParticipantGrant>> {
        let (principal, channel) = (principal.clone(), channel.clone());
        self.run(move |conn| {
            Ok(load_grant(conn, principal.as_str(), channel.as_str())?.filter(|g| g.is_active()))
        })
        .await
    }

    async fn grants_for_channel(&self, channel: &ChannelId) -> Result<Vec<ParticipantGrant>> {
        let channel = channel.clone();
        self.run(move |conn| query_grants(conn, "g.channel_id = ?1", params![channel.as_str()]))
            .await
    }

    async fn active_grants_for(&self, principal: &PrincipalId) -> Result<Vec<ParticipantGrant>> {
        let principal = principal.clone();
        self.run(move |conn| {
            query_grants(
                conn,
                "g.principal_id = ?1 AND g.left_at IS NULL",
                params![principal.as_str()],
            )
        })
        .await
    }

    async fn terminate_grant(&self, principal: &PrincipalId, channel: &ChannelId, at: i64) -> Result<bool> {
        let (principal, channel) = (principal.clone(), channel.clone());
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE grants SET left_at = ?1
                 WHERE principal_id = ?2 AND channel_id = ?3 AND left_at IS NULL",
                params![at, principal.as_str(), channel.as_str()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn terminate_all_grants(&self, principal: &PrincipalId, at: i64) -> Result<Vec<ChannelId>> {
        let principal = principal.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let channels = {
                let mut stmt = tx.prepare(
                    "SELECT channel_id FROM grants
                     WHERE principal_id = ?1 AND left_at IS NULL
                     ORDER BY channel_id",
                )?;
                let ids = stmt
                    .query_map(params![principal.as_str()], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                ids.into_iter().map(ChannelId::new).collect::<Vec<_>>()
            };

            tx.execute(
                "UPDATE grants SET left_at = ?1 WHERE principal_id = ?2 AND left_at IS NULL",
                params![at, principal.as_str()],
            )?;

            tx.commit()?;
            tracing::debug!(principal = %principal, count = channels.len(), "terminated grants");
            Ok(channels)
        })
        .await
    }

    async fn append_message(&self, message: &StoredMessage) -> Result<AppendResult> {
        let message = message.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let channel = load_channel(&tx, message.channel_id.as_str())?
                .ok_or_else(|| StoreError::NotFound(format!("channel {}", message.channel_id)))?;
            if channel.mode != message.body.mode() {
                return Err(StoreError::InvalidData(format!(
                    "{} body on {} channel {}",
                    message.body.mode(),
                    channel.mode,
                    channel.id
                )));
            }

            let grant = load_grant(&tx, message.sender.as_str(), message.channel_id.as_str())?;
            if let Some(reason) = AppendResult::check_grant(grant.as_ref()) {
                tracing::debug!(channel = %message.channel_id, sender = %message.sender, %reason, "append denied");
                return Ok(AppendResult::Denied(reason));
            }

            tx.execute(
                "INSERT INTO messages (id, channel_id, sender, kind, body, assessment, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id.as_str(),
                    message.channel_id.as_str(),
                    message.sender.as_str(),
                    message.kind.as_str(),
                    to_json(&message.body)?,
                    to_json(&message.assessment)?,
                    message.sent_at,
                ],
            )?;

            tx.commit()?;
            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn messages(&self, channel: &ChannelId) -> Result<Vec<StoredMessage>> {
        let channel = channel.clone();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel_id, sender, kind, body, assessment, sent_at
                 FROM messages WHERE channel_id = ?1 ORDER BY seq",
            )?;
            let rows = stmt
                .query_map(params![channel.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(id, channel_id, sender, kind, body, assessment, sent_at)| {
                    Ok(StoredMessage {
                        id: id.into(),
                        channel_id: channel_id.into(),
                        sender: sender.into(),
                        kind: parse_column(&kind, safehall_policy::MessageKind::parse, "kind")?,
                        body: from_json(&body)?,
                        assessment: from_json(&assessment)?,
                        sent_at,
                    })
                })
                .collect()
        })
        .await
    }
}

#[async_trait]
impl IncidentStore for SqliteStore {
    async fn create_incident(&self, incident: &EmergencyIncident) -> Result<IncidentId> {
        let incident = incident.clone();
        self.run(move |conn| {
            let id = IncidentId::generate();
            conn.execute(
                "INSERT INTO incidents (id, status, record, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.as_str(),
                    incident.status.as_str(),
                    to_cbor(&incident)?,
                    incident.created_at,
                ],
            )?;
            Ok(id)
        })
        .await
    }

    async fn get_incident(&self, id: &IncidentId) -> Result<Option<EmergencyIncident>> {
        let id = id.clone();
        self.run(move |conn| {
            conn.query_row(
                "SELECT record FROM incidents WHERE id = ?1",
                params![id.as_str()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?
            .map(|bytes| from_cbor(&bytes))
            .transpose()
        })
        .await
    }

    async fn advance_incident(&self, id: &IncidentId, to: IncidentStatus) -> Result<IncidentStatus> {
        let id = id.clone();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            let bytes: Vec<u8> = tx
                .query_row(
                    "SELECT record FROM incidents WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("incident {id}")))?;
            let mut incident: EmergencyIncident = from_cbor(&bytes)?;

            let from = incident.status;
            incident.advance(to)?;

            tx.execute(
                "UPDATE incidents SET status = ?1, record = ?2 WHERE id = ?3",
                params![incident.status.as_str(), to_cbor(&incident)?, id.as_str()],
            )?;

            tx.commit()?;
            Ok(from)
        })
        .await
    }

    async fn incidents(&self) -> Result<Vec<(IncidentId, EmergencyIncident)>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT id, record FROM incidents ORDER BY seq")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .map(|(id, bytes)| Ok((IncidentId::new(id), from_cbor(&bytes)?)))
                .collect()
        })
        .await
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let entry = entry.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO audit_events (recorded_at, event) VALUES (?1, ?2)",
                params![entry.recorded_at, to_cbor(&entry.event)?],
            )?;
            Ok(())
        })
        .await
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT recorded_at, event FROM audit_events ORDER BY seq")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .map(|(recorded_at, bytes)| Ok(AuditEntry::new(recorded_at, from_cbor(&bytes)?)))
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AuditEvent, MessageBody};
    use safehall_core::{IncidentKind, MessageId};
    use safehall_policy::{DeniedReason, MessageKind};
    use safehall_safety::ContentAssessment;

    fn school_channel() -> (Principal, Principal, Channel) {
        let teacher = Principal::new("t1", Role::Teacher, "school", "Ms. T");
        let student = Principal::new("s1", Role::Student, "school", "Sam");
        let channel = Channel::new("c1", ChannelType::Direct, ChannelMode::Moderated, "school", "t1").unwrap();
        (teacher, student, channel)
    }

    async fn seed(store: &SqliteStore) -> (Principal, Principal, Channel) {
        let (teacher, student, channel) = school_channel();
        store.put_principal(&teacher).await.unwrap();
        store.put_principal(&student).await.unwrap();
        let grants = [
            ParticipantGrant::issue(&teacher, &channel, PermissionLevel::Moderator, 1).unwrap(),
            ParticipantGrant::issue(&student, &channel, PermissionLevel::ReadWrite, 1).unwrap(),
        ];
        store.insert_channel(&channel, &grants).await.unwrap();
        (teacher, student, channel)
    }

    fn text_message(sender: &Principal, channel: &Channel, text: &str) -> StoredMessage {
        StoredMessage {
            id: MessageId::generate(),
            channel_id: channel.id.clone(),
            sender: sender.id.clone(),
            kind: MessageKind::Text,
            body: MessageBody::Moderated { text: text.into() },
            assessment: ContentAssessment::clean(),
            sent_at: 10,
        }
    }

    #[tokio::test]
    async fn test_channel_and_grants_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let (teacher, student, channel) = seed(&store).await;

        assert_eq!(store.get_channel(&channel.id).await.unwrap(), Some(channel.clone()));
        assert_eq!(store.get_principal(&student.id).await.unwrap(), Some(student.clone()));

        let grants = store.grants_for_channel(&channel.id).await.unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].principal(), &student.id);
        assert_eq!(grants[1].principal(), &teacher.id);
        assert!(grants.iter().all(|g| g.is_active()));
    }

    #[tokio::test]
    async fn test_duplicate_channel_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let (_, _, channel) = seed(&store).await;

        let err = store.insert_channel(&channel, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_grant_for_unknown_principal_rolls_back_channel() {
        let store = SqliteStore::open_memory().unwrap();
        let (teacher, _, channel) = school_channel();
        store.put_principal(&teacher).await.unwrap();

        let ghost = Principal::new("ghost", Role::Student, "school", "Ghost");
        let grants = [
            ParticipantGrant::issue(&teacher, &channel, PermissionLevel::Moderator, 1).unwrap(),
            ParticipantGrant::issue(&ghost, &channel, PermissionLevel::ReadWrite, 1).unwrap(),
        ];
        let err = store.insert_channel(&channel, &grants).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.get_channel(&channel.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_append_after_termination_is_denied() {
        let store = SqliteStore::open_memory().unwrap();
        let (_, student, channel) = seed(&store).await;

        let first = text_message(&student, &channel, "hello");
        assert_eq!(store.append_message(&first).await.unwrap(), AppendResult::Appended);

        assert!(store.terminate_grant(&student.id, &channel.id, 20).await.unwrap());
        assert!(!store.terminate_grant(&student.id, &channel.id, 30).await.unwrap());

        let second = text_message(&student, &channel, "still here?");
        assert_eq!(
            store.append_message(&second).await.unwrap(),
            AppendResult::Denied(DeniedReason::GrantTerminated)
        );

        let stored = store.messages(&channel.id).await.unwrap();
        assert_eq!(stored, vec![first]);
    }

    #[tokio::test]
    async fn test_append_from_stranger_is_denied() {
        let store = SqliteStore::open_memory().unwrap();
        let (_, _, channel) = seed(&store).await;
        let stranger = Principal::new("x", Role::Student, "school", "X");
        store.put_principal(&stranger).await.unwrap();

        let result = store.append_message(&text_message(&stranger, &channel, "hi")).await.unwrap();
        assert_eq!(result, AppendResult::Denied(DeniedReason::NotParticipant));
    }

    #[tokio::test]
    async fn test_terminate_all_reports_only_newly_ended() {
        let store = SqliteStore::open_memory().unwrap();
        let (teacher, student, channel) = seed(&store).await;

        let other = Channel::new("c2", ChannelType::Direct, ChannelMode::Moderated, "school", "t1").unwrap();
        let grants = [ParticipantGrant::issue(&student, &other, PermissionLevel::ReadWrite, 2).unwrap()];
        store.insert_channel(&other, &grants).await.unwrap();

        store.terminate_grant(&student.id, &other.id, 3).await.unwrap();

        let ended = store.terminate_all_grants(&student.id, 4).await.unwrap();
        assert_eq!(ended, vec![channel.id.clone()]);
        assert!(store.active_grants_for(&student.id).await.unwrap().is_empty());
        assert_eq!(store.active_grants_for(&teacher.id).await.unwrap().len(), 1);

        let again = store.terminate_all_grants(&student.id, 5).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_incident_lifecycle() {
        let store = SqliteStore::open_memory().unwrap();
        let incident = EmergencyIncident::safety_button(PrincipalId::new("s1"), "help", 100);
        let id = store.create_incident(&incident).await.unwrap();

        let from = store.advance_incident(&id, IncidentStatus::Investigating).await.unwrap();
        assert_eq!(from, IncidentStatus::Open);

        let err = store.advance_incident(&id, IncidentStatus::Open).await.unwrap_err();
        assert!(matches!(err, StoreError::Incident(_)));

        let loaded = store.get_incident(&id).await.unwrap().unwrap();
        assert_eq!(loaded.status, IncidentStatus::Investigating);
        assert!(matches!(loaded.kind, IncidentKind::SafetyButton));

        let missing = store.advance_incident(&IncidentId::new("nope"), IncidentStatus::Resolved).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safehall.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let (_, student, channel) = seed(&store).await;
            store.publish_public_key(&student.id, "PEM").await.unwrap();
            store
                .append_message(&text_message(&student, &channel, "saved"))
                .await
                .unwrap();
            store
                .append(&AuditEntry::new(
                    7,
                    AuditEvent::GrantsTerminated {
                        principal: student.id.clone(),
                        channels: vec![],
                    },
                ))
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let student = PrincipalId::new("s1");
        assert_eq!(store.lookup_public_key(&student).await.unwrap().as_deref(), Some("PEM"));
        assert_eq!(store.messages(&ChannelId::new("c1")).await.unwrap().len(), 1);
        assert_eq!(store.entries().await.unwrap().len(), 1);
    }
}
