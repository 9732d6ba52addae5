//! # CredVault
//!
//! Encrypted, versioned credential storage with path-scoped access control.
//!
//! ## Overview
//!
//! CredVault stores named secrets for a multi-tenant platform:
//!
//! - **Credentials**: Named, typed secrets (passwords, certificates, SSH and RSA
//!   key pairs, users, JSON documents, plain values)
//! - **Versions**: Every write appends an immutable, encrypted version
//! - **Permissions**: Per-actor grants on exact names or ancestor prefixes
//! - **Certificate chaining**: Certificates take their CA from a named CA credential
//!
//! ## Key Concepts
//!
//! - **Name**: Absolute, `/`-separated, unique ignoring case.
//! - **Secret field**: The one field of a value that is encrypted at rest.
//! - **Creator grant**: The first writer of a credential holds every operation on it.
//! - **Denial**: Reported exactly like a missing credential.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use credvault::core::{CredentialValue, Encryptor, StaticKeyProvider};
//! use credvault::perms::UserContext;
//! use credvault::store::SqliteStore;
//! use credvault::{SetRequest, Vault, VaultConfig};
//!
//! async fn example() {
//!     let store = SqliteStore::open("vault.db").unwrap();
//!     let encryptor = Encryptor::new(Arc::new(StaticKeyProvider::generate()));
//!     let vault = Vault::new(store, encryptor, VaultConfig::default());
//!
//!     let ctx = UserContext::new("uaa-user:alice");
//!     let outcome = vault
//!         .set(&ctx, SetRequest::new("/team/db-password", CredentialValue::Password("s3cret".into())))
//!         .await
//!         .unwrap();
//!
//!     let value = vault.reveal(&outcome.version).unwrap();
//!     assert_eq!(value.password(), Some("s3cret"));
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `credvault::core` - Values, versions, names and encryption
//! - `credvault::store` - Storage abstraction, memory and SQLite backends
//! - `credvault::perms` - Permission evaluation and ACL management

pub mod audit;
pub mod ca;
pub mod config;
pub mod error;
pub mod generate;
pub mod request;
pub mod vault;

// Re-export component crates
pub use credvault_core as core;
pub use credvault_perms as perms;
pub use credvault_store as store;

// Re-export main types for convenience
pub use audit::{AuditEvent, AuditOperation, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use ca::CertificateAuthorityResolver;
pub use config::VaultConfig;
pub use error::{ErrorKind, Result, VaultError};
pub use request::{GenerateRequest, SetRequest, WriteMode, WriteOutcome, WriteStatus};
pub use vault::Vault;

// Re-export commonly used core types
pub use credvault_core::{
    AccessGrant, CertificateValue, CredentialType, CredentialValue, CredentialVersion,
    GenerationParameters, PermissionEntry, PermissionOperation,
};
pub use credvault_perms::UserContext;
