//! Error types for the permissions module.

use credvault_core::ValidationError;
use credvault_store::StoreError;
use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The actor lacks the operation, or the credential does not exist.
    ///
    /// The two cases are deliberately indistinguishable.
    #[error("the request could not be completed because the credential does not exist or you do not have sufficient authorization")]
    EntryNotFound,

    /// The actor tried to change its own permissions.
    #[error("modification of access control for the authenticated user is not allowed")]
    InvalidAclOperation,

    /// Malformed credential name.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PermsError {
    /// Stable reason code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            PermsError::EntryNotFound => "error.credential.invalid_access",
            PermsError::InvalidAclOperation => "error.acl.invalid_update_operation",
            PermsError::Validation(e) => e.code(),
            PermsError::Store(_) => "error.internal",
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
