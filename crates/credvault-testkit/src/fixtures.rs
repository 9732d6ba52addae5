//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::Arc;

use credvault::perms::UserContext;
use credvault::{MemoryAuditSink, Vault, VaultConfig};
use credvault_core::{
    Clock, Credential, CredentialValue, CredentialVersion, Encryptor, FixedClock, PermissionEntry,
    PermissionOperation, SequentialUuidGenerator, StaticKeyProvider, VersionBuilder,
};
use credvault_store::{MemoryStore, SqliteStore, Store};
use uuid::Uuid;

/// Fixed start time for fixture clocks (Unix ms).
pub const EPOCH: i64 = 1_700_000_000_000;

/// Shared keys, clock and audit sink for one test scenario.
///
/// Every vault built from the same fixture can read what the others wrote.
pub struct TestFixture {
    pub keys: Arc<StaticKeyProvider>,
    pub encryptor: Encryptor,
    pub clock: Arc<FixedClock>,
    pub uuids: Arc<SequentialUuidGenerator>,
    pub audit: Arc<MemoryAuditSink>,
}

impl TestFixture {
    /// Create a new test fixture with a random encryption key.
    pub fn new() -> Self {
        let keys = Arc::new(StaticKeyProvider::generate());
        Self {
            encryptor: Encryptor::new(keys.clone()),
            keys,
            clock: Arc::new(FixedClock::new(EPOCH)),
            uuids: Arc::new(SequentialUuidGenerator::new()),
            audit: Arc::new(MemoryAuditSink::new()),
        }
    }

    /// Build a vault over `store` wired to this fixture.
    pub fn vault<S: Store>(&self, store: S, config: VaultConfig) -> Vault<S> {
        Vault::new(store, self.encryptor.clone(), config)
            .with_audit_sink(self.audit.clone())
            .with_clock(self.clock.clone())
            .with_uuid_generator(self.uuids.clone())
    }

    /// A default-configured vault over an empty memory store.
    pub fn memory_vault(&self) -> Vault<MemoryStore> {
        self.vault(MemoryStore::new(), VaultConfig::default())
    }

    /// A default-configured vault over a SQLite database at `path`.
    ///
    /// Opening the same path again from this fixture sees every earlier write.
    pub fn sqlite_vault(&self, path: &Path) -> Vault<SqliteStore> {
        let store = SqliteStore::open(path).expect("fixture database should open");
        self.vault(store, VaultConfig::default())
    }

    /// Seal `value` as the first version of a new credential, bypassing the vault.
    pub fn first_version(&self, name: &str, value: CredentialValue) -> CredentialVersion {
        let credential = Credential::new(Uuid::new_v4(), name, self.clock.now_millis());
        VersionBuilder::new(credential, Uuid::new_v4())
            .timestamp(self.clock.now_millis())
            .value(value)
            .seal(&self.encryptor)
            .expect("fixture value should seal")
    }

    /// Move the clock forward so later writes sort after earlier ones.
    pub fn tick(&self) {
        self.clock.advance(1_000);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Grant `operations` on `path` to `actor` directly in the store.
pub async fn grant<S: Store>(
    store: &S,
    path: &str,
    actor: &str,
    operations: impl IntoIterator<Item = PermissionOperation>,
) {
    store
        .upsert_permissions(&[PermissionEntry::new(path, actor, operations)])
        .await
        .expect("fixture grant should persist");
}

/// Create distinct caller contexts for multi-actor tests.
pub fn multi_actor_contexts(count: usize) -> Vec<UserContext> {
    (0..count)
        .map(|i| UserContext::new(format!("uaa-user:actor-{}", i)))
        .collect()
}
