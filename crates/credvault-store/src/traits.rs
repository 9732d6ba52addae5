//! Store trait: the abstract interface for credential persistence.
//!
//! This trait allows the vault to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use credvault_core::{Credential, CredentialVersion, PermissionEntry};
use uuid::Uuid;

use crate::error::Result;

/// Options for [`Store::save`].
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Allow the new version to have a different type than the most recent one.
    pub allow_type_change: bool,
    /// Permission entries upserted in the same transaction as the version.
    pub permissions: Vec<PermissionEntry>,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_type_change(mut self, allow: bool) -> Self {
        self.allow_type_change = allow;
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<PermissionEntry>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Result of saving a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// The credential did not exist and was created with this version.
    Created,
    /// The version was appended to an existing credential.
    Appended,
}

/// The Store trait: async interface for credential persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Append-only**: `save` inserts a version row; persisted versions are never updated.
/// - **Name uniqueness**: names are unique ignoring case. Creating a credential whose
///   name was taken by a concurrent writer fails with `DuplicateWrite`.
/// - **Ordering**: "most recent" is the greatest creation timestamp, ties broken by
///   insertion order.
/// - **Cascade**: `delete` removes versions and permission entries on the exact name.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Credential Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Find a credential by name, ignoring case.
    async fn find_credential(&self, name: &str) -> Result<Option<Credential>>;

    /// Most recent version of a credential, ignoring case in the name.
    async fn find_most_recent(&self, name: &str) -> Result<Option<CredentialVersion>>;

    /// A version by its UUID.
    async fn find_by_uuid(&self, uuid: &Uuid) -> Result<Option<CredentialVersion>>;

    /// Every version of a credential, newest first.
    async fn find_all_versions(&self, name: &str) -> Result<Vec<CredentialVersion>>;

    /// Most recent version of every certificate credential chained to `ca_name`.
    async fn find_signed_by(&self, ca_name: &str) -> Result<Vec<CredentialVersion>>;

    /// Append a version, creating its credential if the name is new.
    ///
    /// # Returns
    /// - `Created` if the credential row was inserted with this version.
    /// - `Appended` if the credential already existed.
    ///
    /// # Errors
    /// - `DuplicateWrite` if the name belongs to a different credential identity.
    /// - `TypeMismatch` if the type differs and `allow_type_change` is false.
    async fn save(&self, version: &CredentialVersion, options: &SaveOptions) -> Result<SaveResult>;

    /// Delete a credential with its versions and exact-path permission entries.
    ///
    /// Returns false if no credential had this name.
    async fn delete(&self, name: &str) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every permission entry held by an actor, on any path.
    async fn find_permissions_for_actor(&self, actor: &str) -> Result<Vec<PermissionEntry>>;

    /// Entries registered on exactly this path, ignoring case.
    async fn find_permissions(&self, path: &str) -> Result<Vec<PermissionEntry>>;

    /// Insert entries, merging operations into any entry with the same path and actor.
    async fn upsert_permissions(&self, entries: &[PermissionEntry]) -> Result<()>;

    /// Remove an actor's entry on a path. Returns false if there was none.
    async fn delete_permission(&self, path: &str, actor: &str) -> Result<bool>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn find_credential(&self, name: &str) -> Result<Option<Credential>> {
        (**self).find_credential(name).await
    }

    async fn find_most_recent(&self, name: &str) -> Result<Option<CredentialVersion>> {
        (**self).find_most_recent(name).await
    }

    async fn find_by_uuid(&self, uuid: &Uuid) -> Result<Option<CredentialVersion>> {
        (**self).find_by_uuid(uuid).await
    }

    async fn find_all_versions(&self, name: &str) -> Result<Vec<CredentialVersion>> {
        (**self).find_all_versions(name).await
    }

    async fn find_signed_by(&self, ca_name: &str) -> Result<Vec<CredentialVersion>> {
        (**self).find_signed_by(ca_name).await
    }

    async fn save(&self, version: &CredentialVersion, options: &SaveOptions) -> Result<SaveResult> {
        (**self).save(version, options).await
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        (**self).delete(name).await
    }

    async fn find_permissions_for_actor(&self, actor: &str) -> Result<Vec<PermissionEntry>> {
        (**self).find_permissions_for_actor(actor).await
    }

    async fn find_permissions(&self, path: &str) -> Result<Vec<PermissionEntry>> {
        (**self).find_permissions(path).await
    }

    async fn upsert_permissions(&self, entries: &[PermissionEntry]) -> Result<()> {
        (**self).upsert_permissions(entries).await
    }

    async fn delete_permission(&self, path: &str, actor: &str) -> Result<bool> {
        (**self).delete_permission(path, actor).await
    }
}
