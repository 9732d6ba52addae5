//! # CredVault Testkit
//!
//! Testing utilities for CredVault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Shared keys, a fixed clock, sequential UUIDs and an
//!   in-memory audit sink, wired into vaults over any store
//! - **Generators**: Proptest strategies for names, values and generation
//!   parameters
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use credvault_testkit::generators::WriteParams;
//! use credvault_testkit::fixtures::TestFixture;
//!
//! proptest! {
//!     #[test]
//!     fn sealed_values_decrypt(params: WriteParams) {
//!         let fixture = TestFixture::new();
//!         let version = fixture.first_version(&params.name, params.value.clone());
//!         prop_assert_eq!(version.decrypt(&fixture.encryptor).unwrap(), params.value);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use credvault_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let vault = fixture.memory_vault();
//! assert!(vault.config().acls_enabled);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{grant, multi_actor_contexts, TestFixture, EPOCH};
pub use generators::{credential_name, credential_value, WriteParams};
