//! End-to-end scenarios across the vault, permissions and both stores.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use credvault::core::{
    Credential, CredentialVersion, EncryptionKey, PermissionEntry, RsaValue, SshValue,
};
use credvault::store::{MemoryStore, SaveOptions, SaveResult, SqliteStore, Store};
use credvault::{
    AccessGrant, AuditOperation, CertificateValue, CredentialType, CredentialValue, ErrorKind,
    GenerateRequest, PermissionOperation, SetRequest, UserContext, VaultConfig, VaultError,
    WriteMode, WriteStatus,
};
use credvault_testkit::{grant, TestFixture};
use uuid::Uuid;

use PermissionOperation::*;

const ALICE: &str = "uaa-user:alice";
const BOB: &str = "uaa-user:bob";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn password(name: &str, value: &str) -> SetRequest {
    SetRequest::new(name, CredentialValue::Password(value.into()))
}

fn certificate(request_name: &str, value: CertificateValue) -> SetRequest {
    SetRequest::new(request_name, CredentialValue::Certificate(value))
}

// ─────────────────────────────────────────────────────────────────────────────
// A store that loses the first create race
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps a store so that a rival version is saved just before the next save.
struct RacingStore {
    inner: MemoryStore,
    rival: Mutex<Option<(CredentialVersion, SaveOptions)>>,
}

impl RacingStore {
    fn new(rival: CredentialVersion, options: SaveOptions) -> Self {
        Self {
            inner: MemoryStore::new(),
            rival: Mutex::new(Some((rival, options))),
        }
    }
}

#[async_trait]
impl Store for RacingStore {
    async fn find_credential(&self, name: &str) -> credvault::store::Result<Option<Credential>> {
        self.inner.find_credential(name).await
    }

    async fn find_most_recent(
        &self,
        name: &str,
    ) -> credvault::store::Result<Option<CredentialVersion>> {
        self.inner.find_most_recent(name).await
    }

    async fn find_by_uuid(&self, uuid: &Uuid) -> credvault::store::Result<Option<CredentialVersion>> {
        self.inner.find_by_uuid(uuid).await
    }

    async fn find_all_versions(&self, name: &str) -> credvault::store::Result<Vec<CredentialVersion>> {
        self.inner.find_all_versions(name).await
    }

    async fn find_signed_by(&self, ca_name: &str) -> credvault::store::Result<Vec<CredentialVersion>> {
        self.inner.find_signed_by(ca_name).await
    }

    async fn save(
        &self,
        version: &CredentialVersion,
        options: &SaveOptions,
    ) -> credvault::store::Result<SaveResult> {
        let rival = self.rival.lock().unwrap().take();
        if let Some((rival, rival_options)) = rival {
            self.inner.save(&rival, &rival_options).await?;
        }
        self.inner.save(version, options).await
    }

    async fn delete(&self, name: &str) -> credvault::store::Result<bool> {
        self.inner.delete(name).await
    }

    async fn find_permissions_for_actor(
        &self,
        actor: &str,
    ) -> credvault::store::Result<Vec<PermissionEntry>> {
        self.inner.find_permissions_for_actor(actor).await
    }

    async fn find_permissions(&self, path: &str) -> credvault::store::Result<Vec<PermissionEntry>> {
        self.inner.find_permissions(path).await
    }

    async fn upsert_permissions(&self, entries: &[PermissionEntry]) -> credvault::store::Result<()> {
        self.inner.upsert_permissions(entries).await
    }

    async fn delete_permission(&self, path: &str, actor: &str) -> credvault::store::Result<bool> {
        self.inner.delete_permission(path, actor).await
    }
}

/// Bob's version of `/c/new`, saved with Bob's creator entry.
fn bob_rival(fixture: &TestFixture) -> (CredentialVersion, SaveOptions) {
    let rival = fixture.first_version("/c/new", CredentialValue::Password("bob-wins".into()));
    let options = SaveOptions::new().with_permissions(vec![PermissionEntry::new(
        "/c/new",
        BOB,
        PermissionOperation::ALL,
    )]);
    (rival, options)
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ancestor_grant_allows_password_write() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/a/", ALICE, [Write]).await;
    let alice = UserContext::new(ALICE);

    let outcome = vault.set(&alice, password("/a/cred", "test-password")).await.unwrap();
    assert_eq!(outcome.status, WriteStatus::Created);

    let stored = vault.store().find_most_recent("/a/cred").await.unwrap().unwrap();
    assert_eq!(stored.credential_type(), CredentialType::Password);
    assert_eq!(
        stored.decrypt(vault.encryptor()).unwrap(),
        CredentialValue::Password("test-password".into())
    );

    // The creator entry adds READ on top of the ancestor WRITE grant.
    assert!(vault.get(&alice, "/a/cred").await.is_ok());
}

#[tokio::test]
async fn test_denied_write_leaves_no_trace() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/a/", ALICE, [Write]).await;
    let alice = UserContext::new(ALICE);

    let err = vault.set(&alice, password("/b/cred", "nope")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationDenied);
    assert_eq!(err.code(), "error.credential.invalid_access");

    assert!(vault.store().find_credential("/b/cred").await.unwrap().is_none());
    assert!(vault.store().find_permissions("/b/cred").await.unwrap().is_empty());
    assert!(fixture.audit.events().is_empty());
}

#[tokio::test]
async fn test_losing_create_race_appends_to_winner() {
    init_tracing();
    let fixture = TestFixture::new();
    let (rival, options) = bob_rival(&fixture);
    let rival_credential = rival.credential().uuid;
    let vault = fixture.vault(RacingStore::new(rival, options), VaultConfig::default());
    grant(vault.store(), "/c/", ALICE, [Write]).await;
    let alice = UserContext::new(ALICE);

    let outcome = vault.set(&alice, password("/c/new", "alice-too")).await.unwrap();
    assert_eq!(outcome.status, WriteStatus::Appended);
    assert_eq!(outcome.version.credential().uuid, rival_credential);

    let versions = vault.store().find_all_versions("/c/new").await.unwrap();
    assert_eq!(versions.len(), 2);

    // Only the winner holds a creator entry.
    let entries = vault.store().find_permissions("/c/new").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor, BOB);

    let events = fixture.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].resource_uuid, Some(rival_credential));
}

#[tokio::test]
async fn test_no_overwrite_race_keeps_winner() {
    init_tracing();
    let fixture = TestFixture::new();
    let (rival, options) = bob_rival(&fixture);
    let rival_version = *rival.uuid();
    let vault = fixture.vault(RacingStore::new(rival, options), VaultConfig::default());
    grant(vault.store(), "/c/", ALICE, [Write]).await;

    let outcome = vault
        .set(
            &UserContext::new(ALICE),
            password("/c/new", "alice-too").mode(WriteMode::NoOverwrite),
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, WriteStatus::Unchanged);
    assert_eq!(*outcome.version.uuid(), rival_version);
    assert_eq!(vault.store().find_all_versions("/c/new").await.unwrap().len(), 1);
    assert!(fixture.audit.events().is_empty());
}

#[tokio::test]
async fn test_losing_create_race_to_other_spelling_is_denied() {
    init_tracing();
    let fixture = TestFixture::new();
    let rival = fixture.first_version("/C/NEW", CredentialValue::Password("bob-wins".into()));
    let options = SaveOptions::new().with_permissions(vec![PermissionEntry::new(
        "/C/NEW",
        BOB,
        PermissionOperation::ALL,
    )]);
    let vault = fixture.vault(RacingStore::new(rival, options), VaultConfig::default());
    grant(vault.store(), "/c/", ALICE, [Write, Read]).await;
    let alice = UserContext::new(ALICE);

    let err = vault.set(&alice, password("/c/new", "alice-too")).await.unwrap_err();
    assert!(matches!(err, VaultError::EntryNotFound));

    let versions = vault.store().find_all_versions("/c/new").await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].name(), "/C/NEW");
    assert!(fixture.audit.events().is_empty());
}

#[tokio::test]
async fn test_conflict_surfaces_without_retry() {
    init_tracing();
    let fixture = TestFixture::new();
    let (rival, options) = bob_rival(&fixture);
    let config = VaultConfig {
        retry_on_conflict: false,
        ..VaultConfig::default()
    };
    let vault = fixture.vault(RacingStore::new(rival, options), config);
    grant(vault.store(), "/c/", ALICE, [Write]).await;

    let err = vault
        .set(&UserContext::new(ALICE), password("/c/new", "alice-too"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Conflict { .. }));
    assert_eq!(err.kind(), ErrorKind::ConflictRetryable);
    assert_eq!(vault.store().find_all_versions("/c/new").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_first_writes_share_one_credential() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fixture = TestFixture::new();
    let vault = fixture.vault(
        SqliteStore::open(dir.path().join("vault.db")).unwrap(),
        VaultConfig::default(),
    );
    grant(vault.store(), "/c/", ALICE, [Write]).await;
    grant(vault.store(), "/c/", BOB, [Write]).await;
    let alice = UserContext::new(ALICE);
    let bob = UserContext::new(BOB);

    let (first, second) = tokio::join!(
        vault.set(&alice, password("/c/new", "from-alice")),
        vault.set(&bob, password("/c/new", "from-bob")),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    let mut statuses = vec![first.status, second.status];
    statuses.sort_by_key(|s| *s == WriteStatus::Appended);
    assert_eq!(statuses, vec![WriteStatus::Created, WriteStatus::Appended]);
    assert_eq!(first.version.credential().uuid, second.version.credential().uuid);

    assert_eq!(vault.store().find_all_versions("/c/new").await.unwrap().len(), 2);
    assert_eq!(vault.store().find_permissions("/c/new").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ca_private_key_never_reaches_dependents() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/pki/", ALICE, PermissionOperation::ALL).await;
    let alice = UserContext::new(ALICE);

    let ca = CertificateValue::new(Some("root-cert"), Some("ca-cert"), Some("ca-private-key"));
    vault.set(&alice, certificate("/pki/ca", ca)).await.unwrap();

    let leaf = CertificateValue::new(None, Some("leaf-cert"), Some("leaf-key")).with_ca_name("/pki/ca");
    let outcome = vault.set(&alice, certificate("/pki/leaf", leaf)).await.unwrap();

    let CredentialValue::Certificate(stored) = vault.reveal(&outcome.version).unwrap() else {
        panic!("expected a certificate");
    };
    assert_eq!(stored.ca, "ca-cert");
    for field in [&stored.ca, &stored.certificate, &stored.private_key] {
        assert!(!field.contains("ca-private-key"));
    }
    assert!(!format!("{:?}", outcome.version.metadata()).contains("ca-private-key"));
}

#[tokio::test]
async fn test_bulk_regenerate_follows_new_ca() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/pki/", ALICE, PermissionOperation::ALL).await;
    let alice = UserContext::new(ALICE);

    let ca = CertificateValue::new(None, Some("ca-cert-1"), Some("ca-key-1"));
    vault.set(&alice, certificate("/pki/ca", ca)).await.unwrap();
    for name in ["/pki/leaf-a", "/pki/leaf-b"] {
        let leaf = CertificateValue::new(None, Some("leaf"), Some("key")).with_ca_name("/pki/ca");
        vault.set(&alice, certificate(name, leaf)).await.unwrap();
    }
    let unrelated = CertificateValue::new(None, Some("other"), Some("key"));
    vault.set(&alice, certificate("/pki/other", unrelated)).await.unwrap();

    fixture.tick();
    let rotated = CertificateValue::new(None, Some("ca-cert-2"), Some("ca-key-2"));
    vault.set(&alice, certificate("/pki/ca", rotated)).await.unwrap();

    fixture.tick();
    let outcomes = vault.regenerate_signed_by(&alice, "/pki/ca").await.unwrap();
    let mut names: Vec<_> = outcomes.iter().map(|o| o.version.name().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["/pki/leaf-a", "/pki/leaf-b"]);

    for outcome in &outcomes {
        assert_eq!(outcome.status, WriteStatus::Appended);
        let CredentialValue::Certificate(leaf) = vault.reveal(&outcome.version).unwrap() else {
            panic!("expected a certificate");
        };
        assert_eq!(leaf.ca, "ca-cert-2");
        assert_eq!(leaf.private_key, "key");
    }
    assert_eq!(vault.store().find_all_versions("/pki/other").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bulk_regenerate_checks_every_target_first() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/pki/", ALICE, PermissionOperation::ALL).await;
    let alice = UserContext::new(ALICE);

    let ca = CertificateValue::new(None, Some("ca-cert"), Some("ca-key"));
    vault.set(&alice, certificate("/pki/ca", ca)).await.unwrap();
    for name in ["/pki/leaf-a", "/pki/leaf-b"] {
        let leaf = CertificateValue::new(None, Some("leaf"), Some("key")).with_ca_name("/pki/ca");
        vault.set(&alice, certificate(name, leaf)).await.unwrap();
    }

    // Bob can read the CA and write only one of its dependents.
    grant(vault.store(), "/pki/ca", BOB, [Read]).await;
    grant(vault.store(), "/pki/leaf-a", BOB, [Write]).await;

    let err = vault
        .regenerate_signed_by(&UserContext::new(BOB), "/pki/ca")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::EntryNotFound));
    assert_eq!(vault.store().find_all_versions("/pki/leaf-a").await.unwrap().len(), 1);

    let err = vault
        .regenerate_signed_by(&alice, "/pki/missing")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::CaNotFound(_)));
}

#[tokio::test]
async fn test_key_rotation_and_certificate_reseal() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/pki/", ALICE, PermissionOperation::ALL).await;
    let alice = UserContext::new(ALICE);

    let cert = CertificateValue::new(None, Some("cert"), Some("private"));
    let first = vault.set(&alice, certificate("/pki/cert", cert)).await.unwrap();
    let old_key = *first.version.encrypted().key_id();

    let new_key = fixture.keys.rotate(EncryptionKey::generate()).unwrap();
    fixture.tick();
    let second = vault.regenerate(&alice, "/pki/cert").await.unwrap();
    assert_eq!(*second.version.encrypted().key_id(), new_key);
    assert_eq!(vault.reveal(&second.version).unwrap(), vault.reveal(&first.version).unwrap());

    assert!(fixture.keys.retire(&old_key).unwrap());
    let err = vault.reveal(&first.version).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CryptoFailure);
    assert!(vault.reveal(&second.version).is_ok());
}

#[tokio::test]
async fn test_generated_password_regenerates_with_stored_parameters() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/gen/", ALICE, PermissionOperation::ALL).await;
    let alice = UserContext::new(ALICE);

    let params = credvault::GenerationParameters {
        length: 16,
        exclude_number: true,
        include_special: true,
        ..Default::default()
    };
    let first = vault
        .generate(&alice, GenerateRequest::password("/gen/pw").parameters(params.clone()))
        .await
        .unwrap();

    fixture.tick();
    let second = vault.regenerate(&alice, "/gen/pw").await.unwrap();
    assert_eq!(second.version.generation_parameters(), Some(&params));

    let old = vault.reveal(&first.version).unwrap();
    let new = vault.reveal(&second.version).unwrap();
    let new_password = new.password().unwrap();
    assert_eq!(new_password.len(), 16);
    assert!(!new_password.chars().any(|c| c.is_ascii_digit()));
    assert_ne!(old.password(), new.password());
}

#[tokio::test]
async fn test_every_type_is_stored_and_read_back() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/all/", ALICE, PermissionOperation::ALL).await;
    let alice = UserContext::new(ALICE);

    let values = vec![
        ("/all/value", CredentialValue::Value("plain".into())),
        ("/all/json", CredentialValue::Json(serde_json::json!({"key": "value"}))),
        ("/all/ssh", CredentialValue::Ssh(SshValue::new(Some("ssh-rsa AAAA"), Some("ssh-private")))),
        ("/all/rsa", CredentialValue::Rsa(RsaValue::new(Some("rsa-public"), Some("rsa-private")))),
        ("/all/user", CredentialValue::User(credvault::core::UserValue::new(Some("svc"), "pw"))),
    ];
    for (name, value) in values {
        vault
            .set(&alice, SetRequest::new(name, value.clone()))
            .await
            .unwrap();
        let latest = vault.get(&alice, name).await.unwrap();
        assert_eq!(latest.credential_type(), value.credential_type());
        assert_eq!(vault.reveal(&latest).unwrap(), value);

        let by_id = vault.get_by_id(&alice, latest.uuid()).await.unwrap();
        assert_eq!(by_id.uuid(), latest.uuid());
    }

    let err = vault
        .set(&alice, SetRequest::new("/all/bad-json", CredentialValue::Json(serde_json::json!([1, 2]))))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "error.invalid_json_value");
}

#[tokio::test]
async fn test_get_by_id_hides_unreadable_versions() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/a/", ALICE, PermissionOperation::ALL).await;

    let outcome = vault
        .set(&UserContext::new(ALICE), password("/a/cred", "secret"))
        .await
        .unwrap();
    let err = vault
        .get_by_id(&UserContext::new(BOB), outcome.version.uuid())
        .await
        .unwrap_err();
    let missing = vault
        .get_by_id(&UserContext::new(BOB), &Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), missing.to_string());
}

#[tokio::test]
async fn test_delete_cascades_to_permissions() {
    init_tracing();
    let fixture = TestFixture::new();
    let vault = fixture.memory_vault();
    grant(vault.store(), "/a/", ALICE, PermissionOperation::ALL).await;
    let alice = UserContext::new(ALICE);

    vault
        .set(&alice, password("/a/cred", "secret").grant(AccessGrant::new(BOB, [Read])))
        .await
        .unwrap();
    assert_eq!(vault.store().find_permissions("/a/cred").await.unwrap().len(), 2);

    vault.delete(&alice, "/A/CRED").await.unwrap();
    assert!(vault.store().find_credential("/a/cred").await.unwrap().is_none());
    assert!(vault.store().find_permissions("/a/cred").await.unwrap().is_empty());
    assert_eq!(vault.store().find_permissions_for_actor(ALICE).await.unwrap().len(), 1);

    let operations: Vec<_> = fixture.audit.events().iter().map(|e| e.operation).collect();
    assert_eq!(
        operations,
        vec![
            AuditOperation::CredentialUpdate,
            AuditOperation::AclUpdate,
            AuditOperation::CredentialDelete
        ]
    );
}

#[tokio::test]
async fn test_sqlite_vault_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let fixture = TestFixture::new();
    let alice = UserContext::new(ALICE);

    {
        let vault = fixture.vault(SqliteStore::open(&path).unwrap(), VaultConfig::default());
        grant(vault.store(), "/a/", ALICE, [Write]).await;
        vault.set(&alice, password("/a/cred", "persisted")).await.unwrap();
    }

    let vault = fixture.vault(SqliteStore::open(&path).unwrap(), VaultConfig::default());
    let latest = vault.get(&alice, "/a/cred").await.unwrap();
    assert_eq!(
        vault.reveal(&latest).unwrap(),
        CredentialValue::Password("persisted".into())
    );
}
