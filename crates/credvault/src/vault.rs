//! The Vault: unified API for credential management.
//!
//! Every operation follows the same shape: normalize the name, check the
//! caller's permission (deny fast), load what exists, build the new version,
//! persist it, then publish audit events. Nothing is persisted or audited
//! when an earlier step fails.

use std::collections::BTreeSet;
use std::sync::Arc;

use credvault_core::{
    normalize_name, validate_generation, AccessGrant, Clock, Credential, CredentialType,
    CredentialValue, CredentialVersion, Encryptor, GenerationParameters, PermissionEntry,
    PermissionOperation, RandomUuidGenerator, SystemClock, UserValue, UuidGenerator,
    ValidationError, VersionBuilder, VersionMetadata,
};
use credvault_perms::{PermissionService, UserContext};
use credvault_store::{SaveOptions, SaveResult, Store, StoreError};
use uuid::Uuid;

use crate::audit::{AuditOperation, AuditRecorder, AuditSink, TracingAuditSink};
use crate::ca::CertificateAuthorityResolver;
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::generate::{generate_password, generate_username};
use crate::request::{GenerateRequest, SetRequest, WriteMode, WriteOutcome, WriteStatus};

/// The main Vault struct.
///
/// Provides a unified API for:
/// - Setting and generating credentials
/// - Regenerating credentials, alone or in bulk by signing CA
/// - Reading and deleting credentials
/// - Managing permission entries
pub struct Vault<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Seals and opens credential secrets.
    encryptor: Encryptor,
    /// Permission checks and ACL management.
    permissions: PermissionService<S>,
    /// CA lookups for certificate chaining.
    ca: CertificateAuthorityResolver<S>,
    /// Receives audit events after each successful mutation.
    audit: Arc<dyn AuditSink>,
    uuids: Arc<dyn UuidGenerator>,
    clock: Arc<dyn Clock>,
    /// Configuration.
    config: VaultConfig,
}

impl<S: Store> Vault<S> {
    /// Create a new vault instance.
    ///
    /// Uses random UUIDs, the system clock and the tracing audit sink until
    /// replaced with the `with_*` methods.
    pub fn new(store: S, encryptor: Encryptor, config: VaultConfig) -> Self {
        let store = Arc::new(store);
        Self {
            permissions: PermissionService::new(Arc::clone(&store), config.acls_enabled),
            ca: CertificateAuthorityResolver::new(Arc::clone(&store)),
            store,
            encryptor,
            audit: Arc::new(TracingAuditSink),
            uuids: Arc::new(RandomUuidGenerator),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_uuid_generator(mut self, uuids: Arc<dyn UuidGenerator>) -> Self {
        self.uuids = uuids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn encryptor(&self) -> &Encryptor {
        &self.encryptor
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn permission_service(&self) -> &PermissionService<S> {
        &self.permissions
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a caller-supplied value under `request.name`.
    ///
    /// A certificate naming a CA has its `ca` field replaced with that CA's
    /// current public certificate, whatever the caller sent.
    pub async fn set(&self, ctx: &UserContext, request: SetRequest) -> Result<WriteOutcome> {
        let name = self.resolve(&request.name).await?;
        self.permissions
            .require(ctx, &name, PermissionOperation::Write)
            .await?;

        let mut value = request.value;
        if let CredentialValue::Certificate(cert) = &mut value {
            if let Some(ca_name) = cert.ca_name.take() {
                let ca_name = normalize_name(&ca_name)?;
                let ca = self.ca.find_active_version(&ca_name).await?;
                cert.ca = ca.certificate;
                cert.ca_name = Some(ca_name);
            }
        }

        let existing = self.store.find_most_recent(&name).await?;
        if let Some(current) = existing.as_ref() {
            match request.mode {
                WriteMode::NoOverwrite => return Ok(unchanged(current)),
                WriteMode::Converge
                    if current.credential_type() == value.credential_type()
                        && current.decrypt(&self.encryptor)? == value =>
                {
                    return Ok(unchanged(current));
                }
                _ => {}
            }
        }

        let version = self.build(&name, existing.as_ref(), value, None)?;
        self.persist(
            ctx,
            version,
            existing.is_some(),
            request.mode,
            &request.additional_permissions,
        )
        .await
    }

    /// Generate a password or user credential under `request.name`.
    pub async fn generate(&self, ctx: &UserContext, request: GenerateRequest) -> Result<WriteOutcome> {
        let name = self.resolve(&request.name).await?;
        self.permissions
            .require(ctx, &name, PermissionOperation::Write)
            .await?;

        let credential_type = request.credential_type;
        if !matches!(credential_type, CredentialType::Password | CredentialType::User) {
            return Err(ValidationError::UnsupportedGenerationType(credential_type).into());
        }
        let params = request
            .parameters
            .unwrap_or_else(|| self.config.default_generation.clone());
        validate_generation(&params)?;

        let existing = self.store.find_most_recent(&name).await?;
        if let Some(current) = existing.as_ref() {
            match request.mode {
                WriteMode::NoOverwrite => return Ok(unchanged(current)),
                WriteMode::Converge
                    if current.credential_type() == credential_type
                        && current.generation_parameters() == Some(&params)
                        && same_username(current, request.username.as_deref()) =>
                {
                    return Ok(unchanged(current));
                }
                _ => {}
            }
        }

        let value = generated_value(credential_type, &params, request.username.as_deref())?;
        let version = self.build(&name, existing.as_ref(), value, Some(params))?;
        self.persist(
            ctx,
            version,
            existing.is_some(),
            request.mode,
            &request.additional_permissions,
        )
        .await
    }

    /// Produce a new version of an existing credential from its stored state.
    ///
    /// Passwords and users are regenerated with their stored parameters.
    /// Certificates re-resolve their CA and re-seal their private key.
    pub async fn regenerate(&self, ctx: &UserContext, name: &str) -> Result<WriteOutcome> {
        let name = self.resolve(name).await?;
        self.permissions
            .require(ctx, &name, PermissionOperation::Write)
            .await?;

        let current = self
            .store
            .find_most_recent(&name)
            .await?
            .ok_or(VaultError::CredentialNotFound)?;
        self.regenerate_version(ctx, current).await
    }

    /// Regenerate every certificate whose CA reference is `signer`.
    ///
    /// Requires READ on the signer and WRITE on every target. Authorization
    /// is checked for all targets before any is written.
    pub async fn regenerate_signed_by(
        &self,
        ctx: &UserContext,
        signer: &str,
    ) -> Result<Vec<WriteOutcome>> {
        let signer = self.resolve(signer).await?;
        self.permissions
            .require(ctx, &signer, PermissionOperation::Read)
            .await?;
        self.ca.find_active_version(&signer).await?;

        let targets = self.store.find_signed_by(&signer).await?;
        for target in &targets {
            self.permissions
                .require(ctx, target.name(), PermissionOperation::Write)
                .await?;
        }

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            outcomes.push(self.regenerate_version(ctx, target).await?);
        }

        tracing::info!(%signer, count = outcomes.len(), actor = %ctx.actor(), "regenerated signed certificates");
        Ok(outcomes)
    }

    async fn regenerate_version(
        &self,
        ctx: &UserContext,
        current: CredentialVersion,
    ) -> Result<WriteOutcome> {
        match current.credential_type() {
            credential_type @ (CredentialType::Password | CredentialType::User) => {
                let params = current
                    .generation_parameters()
                    .cloned()
                    .ok_or_else(|| ValidationError::CannotRegenerate(current.name().to_string()))?;
                let username = match current.metadata() {
                    VersionMetadata::User { username, .. } => Some(username.as_str()),
                    _ => None,
                };
                let value = generated_value(credential_type, &params, username)?;
                let version = self.build(current.name(), Some(&current), value, Some(params))?;
                self.persist(ctx, version, true, WriteMode::Overwrite, &[])
                    .await
            }
            CredentialType::Certificate => {
                let mut next = current.successor(self.uuids.generate(), self.clock.now_millis());
                if let Some(ca_name) = current.ca_name() {
                    let ca = self.ca.find_active_version(ca_name).await?;
                    next.set_ca(ca.certificate)?;
                }
                next.reseal(&self.encryptor)?;
                self.persist(ctx, next, true, WriteMode::Overwrite, &[])
                    .await
            }
            _ => Err(ValidationError::CannotRegenerate(current.name().to_string()).into()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Most recent version of a credential.
    pub async fn get(&self, ctx: &UserContext, name: &str) -> Result<CredentialVersion> {
        let name = self.resolve(name).await?;
        self.permissions
            .require(ctx, &name, PermissionOperation::Read)
            .await?;

        self.store
            .find_most_recent(&name)
            .await?
            .ok_or(VaultError::CredentialNotFound)
    }

    /// A specific version by UUID.
    pub async fn get_by_id(&self, ctx: &UserContext, uuid: &Uuid) -> Result<CredentialVersion> {
        let version = self
            .store
            .find_by_uuid(uuid)
            .await?
            .ok_or(VaultError::CredentialNotFound)?;
        self.permissions
            .require(ctx, version.name(), PermissionOperation::Read)
            .await?;
        Ok(version)
    }

    /// Every version of a credential, newest first.
    pub async fn versions(&self, ctx: &UserContext, name: &str) -> Result<Vec<CredentialVersion>> {
        let name = self.resolve(name).await?;
        self.permissions
            .require(ctx, &name, PermissionOperation::Read)
            .await?;

        let versions = self.store.find_all_versions(&name).await?;
        if versions.is_empty() {
            return Err(VaultError::CredentialNotFound);
        }
        Ok(versions)
    }

    /// Decrypt a version obtained from one of the read operations.
    pub fn reveal(&self, version: &CredentialVersion) -> Result<CredentialValue> {
        Ok(version.decrypt(&self.encryptor)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delete Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete a credential, its versions and its exact-path permission entries.
    pub async fn delete(&self, ctx: &UserContext, name: &str) -> Result<()> {
        let name = self.resolve(name).await?;
        self.permissions
            .require(ctx, &name, PermissionOperation::Delete)
            .await?;

        let credential = self
            .store
            .find_credential(&name)
            .await?
            .ok_or(VaultError::CredentialNotFound)?;
        if !self.store.delete(&credential.name).await? {
            return Err(VaultError::CredentialNotFound);
        }

        let mut recorder = AuditRecorder::new(ctx.actor(), self.clock.now_millis());
        recorder.record(
            AuditOperation::CredentialDelete,
            &credential.name,
            Some(credential.uuid),
            None,
        );
        self.publish(recorder).await?;

        tracing::info!(name = %credential.name, actor = %ctx.actor(), "credential deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Entries registered on a credential. Requires READ_ACL.
    pub async fn permissions(&self, ctx: &UserContext, name: &str) -> Result<Vec<PermissionEntry>> {
        let name = self.resolve(name).await?;
        Ok(self.permissions.get_entries(ctx, &name).await?)
    }

    /// Grant operations on a credential to other actors. Requires WRITE_ACL.
    pub async fn add_permissions(
        &self,
        ctx: &UserContext,
        name: &str,
        grants: &[AccessGrant],
    ) -> Result<Vec<PermissionEntry>> {
        let name = self.resolve(name).await?;
        let entries = self.permissions.save_entries(ctx, &name, grants).await?;
        if entries.is_empty() {
            return Ok(entries);
        }

        let credential_uuid = self.store.find_credential(&name).await?.map(|c| c.uuid);
        let mut recorder = AuditRecorder::new(ctx.actor(), self.clock.now_millis());
        for entry in &entries {
            recorder.record(AuditOperation::AclUpdate, &entry.path, credential_uuid, None);
        }
        self.publish(recorder).await?;
        Ok(entries)
    }

    /// Revoke an actor's entry on a credential. Returns whether one existed.
    pub async fn delete_permission(
        &self,
        ctx: &UserContext,
        name: &str,
        actor: &str,
    ) -> Result<bool> {
        let name = self.resolve(name).await?;
        let credential_uuid = self.store.find_credential(&name).await?.map(|c| c.uuid);
        let removed = self.permissions.delete_entry(ctx, &name, actor).await?;

        if removed {
            let mut recorder = AuditRecorder::new(ctx.actor(), self.clock.now_millis());
            recorder.record(AuditOperation::AclDelete, &name, credential_uuid, None);
            self.publish(recorder).await?;
        }
        Ok(removed)
    }

    /// Operations `actor` holds on `name`, for audit logging.
    pub async fn allowed_operations(
        &self,
        name: &str,
        actor: &str,
    ) -> Result<BTreeSet<PermissionOperation>> {
        let name = self.resolve(name).await?;
        Ok(self.permissions.allowed_operations(&name, actor).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn normalize(&self, name: &str) -> Result<String> {
        let name = normalize_name(name)?;
        if name.len() > self.config.max_name_length {
            return Err(ValidationError::NameTooLong {
                max: self.config.max_name_length,
            }
            .into());
        }
        Ok(name)
    }

    /// Normalize `name` and adopt the stored spelling of an existing
    /// credential, so grants are always checked against the stored name.
    async fn resolve(&self, name: &str) -> Result<String> {
        let name = self.normalize(name)?;
        Ok(match self.store.find_credential(&name).await? {
            Some(credential) => credential.name,
            None => name,
        })
    }

    /// Seal `value` as the next version of `existing`, or as the first
    /// version of a new credential named `name`.
    fn build(
        &self,
        name: &str,
        existing: Option<&CredentialVersion>,
        value: CredentialValue,
        generation: Option<GenerationParameters>,
    ) -> Result<CredentialVersion> {
        let now = self.clock.now_millis();
        let credential = match existing {
            Some(current) => current.credential().clone(),
            None => Credential::new(self.uuids.generate(), name, now),
        };

        Ok(VersionBuilder::new(credential, self.uuids.generate())
            .timestamp(now)
            .value(value)
            .generation(generation)
            .seal(&self.encryptor)?)
    }

    /// Save a built version with its permission entries, then audit it.
    ///
    /// A first write grants the caller every operation on the credential.
    /// Losing a create race is retried once as an append to the winner.
    async fn persist(
        &self,
        ctx: &UserContext,
        version: CredentialVersion,
        exists: bool,
        mode: WriteMode,
        grants: &[AccessGrant],
    ) -> Result<WriteOutcome> {
        if exists {
            self.authorize_grants(ctx, version.name(), grants).await?;
        }

        let mut entries: Vec<PermissionEntry> = grants.iter().map(|g| g.at(version.name())).collect();
        if !exists {
            entries.insert(
                0,
                PermissionEntry::new(version.name(), ctx.actor(), PermissionOperation::ALL),
            );
        }
        let allow_type_change = mode == WriteMode::Overwrite;
        let options = SaveOptions::new()
            .allow_type_change(allow_type_change)
            .with_permissions(entries);

        let (version, result) = match self.store.save(&version, &options).await {
            Ok(result) => (version, result),
            Err(StoreError::DuplicateWrite { name }) if self.config.retry_on_conflict => {
                tracing::warn!(%name, actor = %ctx.actor(), "credential created concurrently, retrying as append");

                let credential = self
                    .store
                    .find_credential(&name)
                    .await?
                    .ok_or_else(|| VaultError::Conflict { name: name.clone() })?;
                self.permissions
                    .require(ctx, &credential.name, PermissionOperation::Write)
                    .await?;

                if mode == WriteMode::NoOverwrite {
                    if let Some(current) = self.store.find_most_recent(&credential.name).await? {
                        return Ok(unchanged(&current));
                    }
                }
                self.authorize_grants(ctx, &credential.name, grants).await?;

                let version = version.rebind(credential);
                let grant_entries = grants.iter().map(|g| g.at(version.name())).collect();
                let retry = SaveOptions::new()
                    .allow_type_change(allow_type_change)
                    .with_permissions(grant_entries);
                match self.store.save(&version, &retry).await {
                    Ok(result) => (version, result),
                    Err(StoreError::DuplicateWrite { name }) => {
                        return Err(VaultError::Conflict { name })
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let credential_uuid = version.credential().uuid;
        let mut recorder = AuditRecorder::new(ctx.actor(), version.created_at());
        recorder.record(
            AuditOperation::CredentialUpdate,
            version.name(),
            Some(credential_uuid),
            Some(*version.uuid()),
        );
        for grant in grants {
            recorder.record(AuditOperation::AclUpdate, version.name(), Some(credential_uuid), None);
            tracing::debug!(name = %version.name(), grantee = %grant.actor, "permission granted with write");
        }
        self.publish(recorder).await?;

        let status = match result {
            SaveResult::Created => WriteStatus::Created,
            SaveResult::Appended => WriteStatus::Appended,
        };
        tracing::info!(
            name = %version.name(),
            version = %version.uuid(),
            credential_type = %version.credential_type(),
            actor = %ctx.actor(),
            ?status,
            "credential written"
        );
        Ok(WriteOutcome { version, status })
    }

    /// Grants on an existing credential need WRITE_ACL and may not target the caller.
    async fn authorize_grants(
        &self,
        ctx: &UserContext,
        name: &str,
        grants: &[AccessGrant],
    ) -> Result<()> {
        if grants.is_empty() {
            return Ok(());
        }
        self.permissions
            .require(ctx, name, PermissionOperation::WriteAcl)
            .await?;
        for grant in grants {
            self.permissions
                .require_actor_change(ctx, name, &grant.actor)
                .await?;
        }
        Ok(())
    }

    async fn publish(&self, recorder: AuditRecorder) -> Result<()> {
        if recorder.is_empty() {
            return Ok(());
        }
        self.audit.publish(&recorder.into_events()).await?;
        Ok(())
    }
}

fn unchanged(current: &CredentialVersion) -> WriteOutcome {
    WriteOutcome {
        version: current.clone(),
        status: WriteStatus::Unchanged,
    }
}

fn same_username(current: &CredentialVersion, requested: Option<&str>) -> bool {
    match (current.metadata(), requested) {
        (VersionMetadata::User { username, .. }, Some(requested)) => username == requested,
        _ => true,
    }
}

fn generated_value(
    credential_type: CredentialType,
    params: &GenerationParameters,
    username: Option<&str>,
) -> Result<CredentialValue> {
    match credential_type {
        CredentialType::Password => Ok(CredentialValue::Password(generate_password(params)?)),
        CredentialType::User => Ok(CredentialValue::User(UserValue {
            username: username.map_or_else(generate_username, str::to_string),
            password: generate_password(params)?,
        })),
        other => Err(ValidationError::UnsupportedGenerationType(other).into()),
    }
}
