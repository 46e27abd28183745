//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!("unknown migration version: {}", version))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE principals (
            id TEXT PRIMARY KEY,
            role TEXT NOT NULL,               -- student | teacher | parent | admin
            org_id TEXT NOT NULL,
            display_name TEXT NOT NULL
        );

        -- Key directory: SPKI PEM per principal
        CREATE TABLE public_keys (
            principal_id TEXT PRIMARY KEY,
            pem TEXT NOT NULL
        );

        CREATE TABLE channels (
            id TEXT PRIMARY KEY,
            channel_type TEXT NOT NULL,       -- direct | announcement | emergency
            mode TEXT NOT NULL,               -- moderated | encrypted
            org_id TEXT NOT NULL,
            created_by TEXT NOT NULL
        );

        -- One grant per (channel, principal), ever. left_at is set once.
        CREATE TABLE grants (
            channel_id TEXT NOT NULL REFERENCES channels(id),
            principal_id TEXT NOT NULL REFERENCES principals(id),
            permission_level TEXT NOT NULL,
            joined_at INTEGER NOT NULL,
            left_at INTEGER,
            PRIMARY KEY (channel_id, principal_id)
        );

        CREATE TABLE messages (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            channel_id TEXT NOT NULL REFERENCES channels(id),
            sender TEXT NOT NULL,
            kind TEXT NOT NULL,
            body TEXT NOT NULL,               -- JSON MessageBody
            assessment TEXT NOT NULL,         -- JSON ContentAssessment
            sent_at INTEGER NOT NULL
        );

        CREATE TABLE incidents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL,
            record BLOB NOT NULL,             -- CBOR EmergencyIncident
            created_at INTEGER NOT NULL
        );

        CREATE TABLE audit_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at INTEGER NOT NULL,
            event BLOB NOT NULL               -- CBOR AuditEvent
        );

        CREATE INDEX idx_grants_principal ON grants(principal_id, left_at);
        CREATE INDEX idx_messages_channel ON messages(channel_id, seq);
        CREATE INDEX idx_incidents_status ON incidents(status);
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "principals",
            "public_keys",
            "channels",
            "grants",
            "messages",
            "incidents",
            "audit_events",
            "schema_migrations",
        ] {
            assert!(tables.contains(&table.to_string()), "{table}");
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }
}
