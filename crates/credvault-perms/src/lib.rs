//! # credvault Permissions
//!
//! Path-scoped access control for credentials.
//!
//! ## Overview
//!
//! Access is expressed as permission entries: an actor, a path and a set of
//! operations. A path is either a full credential name or an ancestor prefix
//! ending in `/`. Entries are additive: an actor may perform an operation
//! when any of its entries on the credential or on an ancestor grants it.
//!
//! ## Key Types
//!
//! - [`PermissionChecker`] - Evaluates an actor's entries against a credential name
//! - [`PermissionService`] - Reads and changes entries on behalf of a caller
//! - [`UserContext`] - The authenticated actor making a request
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use credvault_core::{AccessGrant, PermissionOperation};
//! use credvault_perms::{PermissionService, UserContext};
//! use credvault_store::MemoryStore;
//!
//! async fn example() {
//!     let store = Arc::new(MemoryStore::new());
//!     let service = PermissionService::new(store, true);
//!     let ctx = UserContext::new("uaa-user:owner");
//!
//!     let grant = AccessGrant::new("uaa-client:ci", [PermissionOperation::Read]);
//!     service.save_entries(&ctx, "/team/db-password", &[grant]).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Exact names ignore case**, ancestor prefixes do not
//! - **The root `/` is never an ancestor**; there is no global grant
//! - **Self-lockout**: an actor cannot change its own entries

pub mod checker;
pub mod context;
pub mod error;
pub mod service;

pub use checker::{effective_operations, evaluate, PermissionChecker};
pub use context::UserContext;
pub use error::{PermsError, Result};
pub use service::PermissionService;
