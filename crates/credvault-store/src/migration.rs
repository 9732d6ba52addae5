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
pub fn migrate(conn: &mut Connection, now: i64) -> Result<()> {
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

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per named credential
        CREATE TABLE credentials (
            uuid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_lower TEXT NOT NULL UNIQUE,   -- enforces case-insensitive uniqueness
            created_at INTEGER NOT NULL
        );

        -- Append-only version history
        CREATE TABLE credential_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order, breaks timestamp ties
            uuid TEXT NOT NULL UNIQUE,
            credential_uuid TEXT NOT NULL REFERENCES credentials(uuid),
            credential_type TEXT NOT NULL,
            metadata TEXT NOT NULL,            -- JSON, cleartext type-specific fields
            ca_name_lower TEXT,                -- certificates only
            key_id BLOB NOT NULL,              -- 32 bytes
            nonce BLOB NOT NULL,               -- 12 bytes
            ciphertext BLOB NOT NULL,
            created_at INTEGER NOT NULL        -- Unix ms
        );

        -- Access control entries
        CREATE TABLE permissions (
            path TEXT NOT NULL,
            path_key TEXT NOT NULL,            -- names folded to lower case
            actor TEXT NOT NULL,
            operations INTEGER NOT NULL,       -- PermissionOperation bitmask
            PRIMARY KEY (path_key, actor)
        );

        CREATE INDEX idx_versions_credential ON credential_versions(credential_uuid, created_at, id);
        CREATE INDEX idx_versions_ca_name ON credential_versions(ca_name_lower);
        CREATE INDEX idx_permissions_actor ON permissions(actor);
                "#,
    )?;

    Ok(())
}
