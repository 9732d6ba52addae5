//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use credvault_core::{
    permission_key, same_name, Credential, CredentialType, CredentialVersion, PermissionEntry,
};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::{SaveOptions, SaveResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Credentials indexed by lowercased name.
    credentials: HashMap<String, Credential>,

    /// Versions in insertion order.
    versions: Vec<StoredVersion>,

    /// Next insertion sequence number.
    next_seq: u64,

    /// Permission entries, unique on (path, actor).
    permissions: Vec<PermissionEntry>,
}

struct StoredVersion {
    seq: u64,
    credential_uuid: Uuid,
    version: CredentialVersion,
}

impl MemoryStoreInner {
    fn credential(&self, name: &str) -> Option<&Credential> {
        self.credentials.get(&name.to_lowercase())
    }

    /// Versions of a credential, newest first.
    fn history(&self, credential: &Credential) -> Vec<CredentialVersion> {
        let mut stored: Vec<&StoredVersion> = self
            .versions
            .iter()
            .filter(|v| v.credential_uuid == credential.uuid)
            .collect();
        stored.sort_by_key(|v| std::cmp::Reverse((v.version.created_at(), v.seq)));
        stored
            .into_iter()
            .map(|v| v.version.clone().rebind(credential.clone()))
            .collect()
    }

    fn most_recent(&self, credential: &Credential) -> Option<CredentialVersion> {
        self.history(credential).into_iter().next()
    }

    fn merge_permissions(&mut self, entries: &[PermissionEntry]) {
        for entry in entries {
            let key = permission_key(&entry.path);
            match self
                .permissions
                .iter_mut()
                .find(|p| p.actor == entry.actor && permission_key(&p.path) == key)
            {
                Some(existing) => existing.operations.extend(entry.operations.iter().copied()),
                None => self.permissions.push(entry.clone()),
            }
        }
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_credential(&self, name: &str) -> Result<Option<Credential>> {
        Ok(self.read()?.credential(name).cloned())
    }

    async fn find_most_recent(&self, name: &str) -> Result<Option<CredentialVersion>> {
        let inner = self.read()?;
        Ok(inner.credential(name).and_then(|c| inner.most_recent(c)))
    }

    async fn find_by_uuid(&self, uuid: &Uuid) -> Result<Option<CredentialVersion>> {
        let inner = self.read()?;
        let Some(stored) = inner.versions.iter().find(|v| v.version.uuid() == uuid) else {
            return Ok(None);
        };
        let credential = inner
            .credentials
            .values()
            .find(|c| c.uuid == stored.credential_uuid)
            .ok_or_else(|| StoreError::InvalidData(format!("orphaned version {}", uuid)))?;
        Ok(Some(stored.version.clone().rebind(credential.clone())))
    }

    async fn find_all_versions(&self, name: &str) -> Result<Vec<CredentialVersion>> {
        let inner = self.read()?;
        Ok(inner
            .credential(name)
            .map(|c| inner.history(c))
            .unwrap_or_default())
    }

    async fn find_signed_by(&self, ca_name: &str) -> Result<Vec<CredentialVersion>> {
        let inner = self.read()?;
        let mut signed: Vec<CredentialVersion> = inner
            .credentials
            .values()
            .filter_map(|c| inner.most_recent(c))
            .filter(|v| v.credential_type() == CredentialType::Certificate)
            .filter(|v| v.ca_name().is_some_and(|n| same_name(n, ca_name)))
            .collect();
        signed.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(signed)
    }

    async fn save(&self, version: &CredentialVersion, options: &SaveOptions) -> Result<SaveResult> {
        let mut inner = self.write()?;

        if inner.versions.iter().any(|v| v.version.uuid() == version.uuid()) {
            return Err(StoreError::InvalidData(format!(
                "version {} already exists",
                version.uuid()
            )));
        }

        let result = match inner.credential(version.name()).cloned() {
            None => {
                inner
                    .credentials
                    .insert(version.name().to_lowercase(), version.credential().clone());
                SaveResult::Created
            }
            Some(existing) if existing.uuid != version.credential().uuid => {
                return Err(StoreError::DuplicateWrite {
                    name: version.name().to_string(),
                });
            }
            Some(existing) => {
                if let Some(latest) = inner.most_recent(&existing) {
                    if latest.credential_type() != version.credential_type()
                        && !options.allow_type_change
                    {
                        return Err(StoreError::TypeMismatch {
                            name: existing.name,
                            existing: latest.credential_type(),
                            requested: version.credential_type(),
                        });
                    }
                }
                SaveResult::Appended
            }
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.versions.push(StoredVersion {
            seq,
            credential_uuid: version.credential().uuid,
            version: version.clone(),
        });
        inner.merge_permissions(&options.permissions);

        Ok(result)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(credential) = inner.credentials.remove(&name.to_lowercase()) else {
            return Ok(false);
        };

        inner
            .versions
            .retain(|v| v.credential_uuid != credential.uuid);
        inner
            .permissions
            .retain(|p| permission_key(&p.path) != permission_key(&credential.name));

        Ok(true)
    }

    async fn find_permissions_for_actor(&self, actor: &str) -> Result<Vec<PermissionEntry>> {
        let inner = self.read()?;
        Ok(inner
            .permissions
            .iter()
            .filter(|p| p.actor == actor)
            .cloned()
            .collect())
    }

    async fn find_permissions(&self, path: &str) -> Result<Vec<PermissionEntry>> {
        let inner = self.read()?;
        Ok(inner
            .permissions
            .iter()
            .filter(|p| permission_key(&p.path) == permission_key(path))
            .cloned()
            .collect())
    }

    async fn upsert_permissions(&self, entries: &[PermissionEntry]) -> Result<()> {
        self.write()?.merge_permissions(entries);
        Ok(())
    }

    async fn delete_permission(&self, path: &str, actor: &str) -> Result<bool> {
        let mut inner = self.write()?;
        let before = inner.permissions.len();
        inner
            .permissions
            .retain(|p| !(permission_key(&p.path) == permission_key(path) && p.actor == actor));
        Ok(inner.permissions.len() != before)
    }
}
