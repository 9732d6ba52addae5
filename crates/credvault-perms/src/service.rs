//! Access control list management.
//!
//! Reading a credential's entries requires READ_ACL on it; changing them
//! requires WRITE_ACL, and an actor may never change its own entries.
//! Every denial is reported as [`PermsError::EntryNotFound`] so that callers
//! cannot probe for the existence of credentials they cannot see.

use std::collections::BTreeSet;
use std::sync::Arc;

use credvault_core::{normalize_name, AccessGrant, PermissionEntry, PermissionOperation};
use credvault_store::Store;

use crate::checker::PermissionChecker;
use crate::context::UserContext;
use crate::error::{PermsError, Result};

/// Reads and mutates permission entries on behalf of a caller.
pub struct PermissionService<S: Store> {
    store: Arc<S>,
    checker: PermissionChecker<S>,
}

impl<S: Store> PermissionService<S> {
    pub fn new(store: Arc<S>, acls_enabled: bool) -> Self {
        let checker = PermissionChecker::new(Arc::clone(&store), acls_enabled);
        Self { store, checker }
    }

    pub fn checker(&self) -> &PermissionChecker<S> {
        &self.checker
    }

    /// Fail with `EntryNotFound` unless the caller holds `operation` on `name`.
    pub async fn require(
        &self,
        ctx: &UserContext,
        name: &str,
        operation: PermissionOperation,
    ) -> Result<()> {
        if self.checker.has_permission(ctx.actor(), name, operation).await? {
            return Ok(());
        }
        tracing::warn!(actor = %ctx.actor(), %name, %operation, "permission denied");
        Err(PermsError::EntryNotFound)
    }

    /// Fail with `InvalidAclOperation` unless the caller may change
    /// `target_actor`'s entries on `name`.
    pub async fn require_actor_change(
        &self,
        ctx: &UserContext,
        name: &str,
        target_actor: &str,
    ) -> Result<()> {
        if self
            .checker
            .user_allowed_to_operate_on_actor(ctx, name, target_actor)
            .await?
        {
            return Ok(());
        }
        tracing::warn!(actor = %ctx.actor(), %name, %target_actor, "acl update rejected");
        Err(PermsError::InvalidAclOperation)
    }

    /// Grant additional operations on an existing credential.
    ///
    /// Operations merge into any entry the actor already holds on the
    /// credential's path. Returns the entries written, which is empty when
    /// `grants` is.
    pub async fn save_entries(
        &self,
        ctx: &UserContext,
        name: &str,
        grants: &[AccessGrant],
    ) -> Result<Vec<PermissionEntry>> {
        if grants.is_empty() {
            return Ok(Vec::new());
        }

        let name = self.stored_name(name).await?;
        self.require(ctx, &name, PermissionOperation::WriteAcl).await?;

        for grant in grants {
            self.require_actor_change(ctx, &name, &grant.actor).await?;
        }

        let entries: Vec<PermissionEntry> = grants.iter().map(|g| g.at(&name)).collect();
        self.store.upsert_permissions(&entries).await?;

        tracing::info!(
            actor = %ctx.actor(),
            %name,
            count = entries.len(),
            "permissions granted"
        );
        Ok(entries)
    }

    /// Entries registered on the credential's exact path.
    pub async fn get_entries(&self, ctx: &UserContext, name: &str) -> Result<Vec<PermissionEntry>> {
        let name = self.stored_name(name).await?;
        self.require(ctx, &name, PermissionOperation::ReadAcl).await?;
        Ok(self.store.find_permissions(&name).await?)
    }

    /// Revoke `actor`'s entry on the credential. Returns whether one existed.
    pub async fn delete_entry(&self, ctx: &UserContext, name: &str, actor: &str) -> Result<bool> {
        let name = self.stored_name(name).await?;
        self.require(ctx, &name, PermissionOperation::WriteAcl).await?;
        self.require_actor_change(ctx, &name, actor).await?;

        let removed = self.store.delete_permission(&name, actor).await?;
        if removed {
            tracing::info!(actor = %ctx.actor(), %name, revoked = %actor, "permission revoked");
        }
        Ok(removed)
    }

    /// Operations `actor` holds on `name`, for audit records.
    pub async fn allowed_operations(
        &self,
        name: &str,
        actor: &str,
    ) -> Result<BTreeSet<PermissionOperation>> {
        self.checker.allowed_operations(name, actor).await
    }

    /// The credential's name as stored. Entries are only managed on
    /// credentials that exist, and grants are checked against this spelling.
    async fn stored_name(&self, name: &str) -> Result<String> {
        let credential = self
            .store
            .find_credential(&normalize_name(name)?)
            .await?
            .ok_or(PermsError::EntryNotFound)?;
        Ok(credential.name)
    }
}
