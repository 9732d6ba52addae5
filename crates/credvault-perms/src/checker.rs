//! Permission evaluation.
//!
//! An actor holds an operation on a credential when any of its entries
//! grants it on the credential's exact name (ignoring case) or on one of
//! the name's ancestor prefixes (exact, case-sensitive). There are no deny
//! entries; absence of a grant is a denial.

use std::collections::BTreeSet;
use std::sync::Arc;

use credvault_core::{
    ancestor_paths, normalize_name, same_name, PermissionEntry, PermissionOperation,
};
use credvault_store::Store;

use crate::context::UserContext;
use crate::error::Result;

/// Whether `entries` grant `operation` on the normalized credential `name`.
///
/// Entries are assumed to belong to the actor being checked.
pub fn evaluate(entries: &[PermissionEntry], name: &str, operation: PermissionOperation) -> bool {
    let ancestors = ancestor_paths(name);
    entries
        .iter()
        .filter(|e| applies_to(e, name, &ancestors))
        .any(|e| e.allows(operation))
}

/// Union of the operations `entries` grant on `name`.
pub fn effective_operations(entries: &[PermissionEntry], name: &str) -> BTreeSet<PermissionOperation> {
    let ancestors = ancestor_paths(name);
    entries
        .iter()
        .filter(|e| applies_to(e, name, &ancestors))
        .flat_map(|e| e.operations.iter().copied())
        .collect()
}

fn applies_to(entry: &PermissionEntry, name: &str, ancestors: &[String]) -> bool {
    same_name(&entry.path, name) || ancestors.iter().any(|a| *a == entry.path)
}

/// Answers permission questions against the entries held in a store.
pub struct PermissionChecker<S: Store> {
    store: Arc<S>,
    enabled: bool,
}

impl<S: Store> PermissionChecker<S> {
    /// Create a checker. When `enabled` is false every check grants.
    pub fn new(store: Arc<S>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Does `actor` hold `operation` on credential `name`?
    pub async fn has_permission(
        &self,
        actor: &str,
        name: &str,
        operation: PermissionOperation,
    ) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }

        let name = normalize_name(name)?;
        let entries = self.store.find_permissions_for_actor(actor).await?;
        let granted = evaluate(&entries, &name, operation);

        tracing::debug!(%actor, %name, %operation, granted, "permission check");
        Ok(granted)
    }

    /// May the acting user change `target_actor`'s entries on `name`?
    ///
    /// Never for the acting user itself; otherwise only with WRITE_ACL.
    pub async fn user_allowed_to_operate_on_actor(
        &self,
        ctx: &UserContext,
        name: &str,
        target_actor: &str,
    ) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }
        if ctx.actor() == target_actor {
            return Ok(false);
        }
        self.has_permission(ctx.actor(), name, PermissionOperation::WriteAcl)
            .await
    }

    /// Operations `actor` effectively holds on `name`, for audit records.
    pub async fn allowed_operations(
        &self,
        name: &str,
        actor: &str,
    ) -> Result<BTreeSet<PermissionOperation>> {
        let name = normalize_name(name)?;
        let entries = self.store.find_permissions_for_actor(actor).await?;
        Ok(effective_operations(&entries, &name))
    }
}
