//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for credvault. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use uuid::Uuid;

use credvault_core::{
    permission_key, Clock, Credential, CredentialType, CredentialVersion, EncryptedValue,
    EncryptionNonce, KeyId, PermissionEntry, PermissionOperation, SystemClock, VersionMetadata,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{SaveOptions, SaveResult, Store};

/// Columns selected by every version query, in `row_to_version` order.
const VERSION_COLUMNS: &str = "v.uuid, v.metadata, v.key_id, v.nonce, v.ciphertext, v.created_at, \
     c.uuid, c.name, c.created_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn, SystemClock.now_millis())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn uuid_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn row_to_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<CredentialVersion> {
    let uuid = uuid_column(row, 0)?;

    let metadata_json: String = row.get(1)?;
    let metadata: VersionMetadata =
        serde_json::from_str(&metadata_json).map_err(|e| conversion_error(1, e))?;

    let key_id_bytes: Vec<u8> = row.get(2)?;
    let key_id = KeyId::try_from(key_id_bytes.as_slice()).map_err(|e| conversion_error(2, e))?;

    let nonce_bytes: Vec<u8> = row.get(3)?;
    let nonce =
        EncryptionNonce::try_from(nonce_bytes.as_slice()).map_err(|e| conversion_error(3, e))?;

    let ciphertext: Vec<u8> = row.get(4)?;
    let created_at: i64 = row.get(5)?;

    let credential = Credential::new(uuid_column(row, 6)?, row.get::<_, String>(7)?, row.get(8)?);

    Ok(CredentialVersion::from_parts(
        uuid,
        credential,
        metadata,
        EncryptedValue::from_parts(key_id, nonce, ciphertext),
        created_at,
    ))
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<PermissionEntry> {
    let path: String = row.get(0)?;
    let actor: String = row.get(1)?;
    let mask: u8 = row.get(2)?;
    Ok(PermissionEntry::new(
        path,
        actor,
        PermissionOperation::from_mask(mask),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

fn credential_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Credential>> {
    conn.query_row(
        "SELECT uuid, name, created_at FROM credentials WHERE name_lower = ?1",
        params![name.to_lowercase()],
        |row| Ok(Credential::new(uuid_column(row, 0)?, row.get::<_, String>(1)?, row.get(2)?)),
    )
    .optional()
}

fn versions_of(conn: &Connection, name: &str, limit: Option<u32>) -> Result<Vec<CredentialVersion>> {
    let sql = format!(
        "SELECT {VERSION_COLUMNS} FROM credential_versions v
         JOIN credentials c ON c.uuid = v.credential_uuid
         WHERE c.name_lower = ?1
         ORDER BY v.created_at DESC, v.id DESC
         LIMIT ?2"
    );
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map(i64::from).unwrap_or(-1);
    let mut stmt = conn.prepare(&sql)?;
    let versions = stmt
        .query_map(params![name.to_lowercase(), limit], row_to_version)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(versions)
}

fn latest_type(tx: &Transaction<'_>, credential_uuid: &Uuid) -> Result<Option<CredentialType>> {
    let stored: Option<String> = tx
        .query_row(
            "SELECT credential_type FROM credential_versions
             WHERE credential_uuid = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
            params![credential_uuid.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    stored
        .map(|t| {
            CredentialType::from_str(&t)
                .map_err(|e| StoreError::InvalidData(format!("stored type: {}", e)))
        })
        .transpose()
}

fn upsert_permission_rows(tx: &Transaction<'_>, entries: &[PermissionEntry]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO permissions (path, path_key, actor, operations)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(path_key, actor) DO UPDATE SET operations = operations | excluded.operations",
    )?;
    for entry in entries {
        stmt.execute(params![
            entry.path,
            permission_key(&entry.path),
            entry.actor,
            PermissionOperation::to_mask(&entry.operations),
        ])?;
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn save_version(
    conn: &mut Connection,
    version: &CredentialVersion,
    options: &SaveOptions,
) -> Result<SaveResult> {
    let tx = conn.transaction()?;
    let credential = version.credential();

    let result = match credential_by_name(&tx, &credential.name)? {
        None => {
            let inserted = tx.execute(
                "INSERT INTO credentials (uuid, name, name_lower, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    credential.uuid.to_string(),
                    credential.name,
                    credential.name.to_lowercase(),
                    credential.created_at,
                ],
            );
            match inserted {
                Ok(_) => SaveResult::Created,
                Err(e) if is_unique_violation(&e) => {
                    return Err(StoreError::DuplicateWrite {
                        name: credential.name.clone(),
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
        Some(existing) if existing.uuid != credential.uuid => {
            return Err(StoreError::DuplicateWrite {
                name: credential.name.clone(),
            });
        }
        Some(existing) => {
            if let Some(current) = latest_type(&tx, &existing.uuid)? {
                if current != version.credential_type() && !options.allow_type_change {
                    return Err(StoreError::TypeMismatch {
                        name: existing.name,
                        existing: current,
                        requested: version.credential_type(),
                    });
                }
            }
            SaveResult::Appended
        }
    };

    let metadata = serde_json::to_string(version.metadata())
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let encrypted = version.encrypted();

    let inserted = tx.execute(
        "INSERT INTO credential_versions
         (uuid, credential_uuid, credential_type, metadata, ca_name_lower,
          key_id, nonce, ciphertext, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            version.uuid().to_string(),
            credential.uuid.to_string(),
            version.credential_type().as_str(),
            metadata,
            version.ca_name().map(str::to_lowercase),
            encrypted.key_id().as_bytes().as_slice(),
            encrypted.nonce().as_bytes().as_slice(),
            encrypted.ciphertext(),
            version.created_at(),
        ],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(StoreError::InvalidData(format!(
                "version {} already exists",
                version.uuid()
            )))
        }
        Err(e) => return Err(e.into()),
    }

    upsert_permission_rows(&tx, &options.permissions)?;
    tx.commit()?;

    Ok(result)
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Store for SqliteStore {
    async fn find_credential(&self, name: &str) -> Result<Option<Credential>> {
        let name = name.to_string();
        self.with_conn(move |conn| Ok(credential_by_name(conn, &name)?))
            .await
    }

    async fn find_most_recent(&self, name: &str) -> Result<Option<CredentialVersion>> {
        let name = name.to_string();
        self.with_conn(move |conn| Ok(versions_of(conn, &name, Some(1))?.into_iter().next()))
            .await
    }

    async fn find_by_uuid(&self, uuid: &Uuid) -> Result<Option<CredentialVersion>> {
        let uuid = uuid.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {VERSION_COLUMNS} FROM credential_versions v
                 JOIN credentials c ON c.uuid = v.credential_uuid
                 WHERE v.uuid = ?1"
            );
            Ok(conn
                .query_row(&sql, params![uuid], row_to_version)
                .optional()?)
        })
        .await
    }

    async fn find_all_versions(&self, name: &str) -> Result<Vec<CredentialVersion>> {
        let name = name.to_string();
        self.with_conn(move |conn| versions_of(conn, &name, None))
            .await
    }

    async fn find_signed_by(&self, ca_name: &str) -> Result<Vec<CredentialVersion>> {
        let ca_name = ca_name.to_lowercase();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {VERSION_COLUMNS} FROM credential_versions v
                 JOIN credentials c ON c.uuid = v.credential_uuid
                 WHERE v.ca_name_lower = ?1
                   AND v.credential_type = 'certificate'
                   AND v.id = (
                       SELECT v2.id FROM credential_versions v2
                       WHERE v2.credential_uuid = v.credential_uuid
                       ORDER BY v2.created_at DESC, v2.id DESC
                       LIMIT 1
                   )
                 ORDER BY c.name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let versions = stmt
                .query_map(params![ca_name], row_to_version)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(versions)
        })
        .await
    }

    async fn save(&self, version: &CredentialVersion, options: &SaveOptions) -> Result<SaveResult> {
        let version = version.clone();
        let options = options.clone();
        let result = self
            .with_conn(move |conn| save_version(conn, &version, &options))
            .await;

        if let Err(StoreError::DuplicateWrite { name }) = &result {
            tracing::debug!(%name, "credential created concurrently");
        }
        result
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let Some(credential) = credential_by_name(&tx, &name)? else {
                return Ok(false);
            };
            let uuid = credential.uuid.to_string();

            tx.execute(
                "DELETE FROM credential_versions WHERE credential_uuid = ?1",
                params![uuid],
            )?;
            tx.execute(
                "DELETE FROM permissions WHERE path_key = ?1",
                params![permission_key(&credential.name)],
            )?;
            tx.execute("DELETE FROM credentials WHERE uuid = ?1", params![uuid])?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn find_permissions_for_actor(&self, actor: &str) -> Result<Vec<PermissionEntry>> {
        let actor = actor.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT path, actor, operations FROM permissions WHERE actor = ?1 ORDER BY path",
            )?;
            let entries = stmt
                .query_map(params![actor], row_to_permission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }

    async fn find_permissions(&self, path: &str) -> Result<Vec<PermissionEntry>> {
        let path = permission_key(path);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT path, actor, operations FROM permissions WHERE path_key = ?1 ORDER BY actor",
            )?;
            let entries = stmt
                .query_map(params![path], row_to_permission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }

    async fn upsert_permissions(&self, entries: &[PermissionEntry]) -> Result<()> {
        let entries = entries.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            upsert_permission_rows(&tx, &entries)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_permission(&self, path: &str, actor: &str) -> Result<bool> {
        let path = permission_key(path);
        let actor = actor.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM permissions WHERE path_key = ?1 AND actor = ?2",
                params![path, actor],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}
