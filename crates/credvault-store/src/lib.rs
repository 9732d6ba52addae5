//! # credvault Store
//!
//! Storage abstraction for credvault. Provides a trait-based interface
//! for credential, version and permission persistence with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts persistence behind the [`Store`] trait,
//! allowing the vault to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`SaveOptions`] - Type-change authorization and permissions written with a version
//! - [`SaveResult`] - Whether a save created the credential or appended to it
//!
//! ## Usage
//!
//! ```rust,no_run
//! use credvault_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("credvault.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let latest = store.find_most_recent("/team/db-password").await.unwrap();
//!     assert!(latest.is_none());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: versions are inserted, never updated
//! - **Case-insensitive names**: `/A/b` and `/a/B` are the same credential
//! - **Duplicate writes**: losing a create race returns `DuplicateWrite`, which callers retry
//! - **Encrypted at rest**: the store only ever sees sealed ciphertext

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod conformance;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{SaveOptions, SaveResult, Store};
