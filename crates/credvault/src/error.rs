//! Error types for the Vault.

use credvault_core::{CoreError, CredentialType, CryptoError, ValidationError};
use credvault_perms::PermsError;
use credvault_store::StoreError;
use thiserror::Error;

use crate::audit::AuditError;

/// Coarse classification of a [`VaultError`], for mapping to API outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or incomplete input. Correctable by the caller.
    ValidationFailure,
    /// Permission check failed, or the credential is hidden from the caller.
    AuthorizationDenied,
    /// A looked-up CA or credential does not exist.
    NotFound,
    /// Concurrent creation still conflicted after the retry.
    ConflictRetryable,
    /// Decryption failed or a key was unavailable.
    CryptoFailure,
    /// Any other storage failure.
    Storage,
}

/// Errors that can occur during Vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The credential exists with another type and the write may not change it.
    #[error("credential {name} is of type {existing}, not {requested}")]
    TypeMismatch {
        name: String,
        existing: CredentialType,
        requested: CredentialType,
    },

    /// A field was set on a credential type that does not have it.
    #[error("{field} is not a field of {credential_type} credentials")]
    UnsupportedField {
        field: &'static str,
        credential_type: CredentialType,
    },

    /// Permission denied. Rendered the same as a missing credential.
    #[error("the request could not be completed because the credential does not exist or you do not have sufficient authorization")]
    EntryNotFound,

    /// The caller tried to change its own permissions.
    #[error("modification of access control for the authenticated user is not allowed")]
    InvalidAclOperation,

    /// Credential not found.
    #[error("the request could not be completed because the credential does not exist or you do not have sufficient authorization")]
    CredentialNotFound,

    /// The named certificate authority does not exist or is not a certificate.
    #[error("certificate authority not found: {0}")]
    CaNotFound(String),

    /// Another writer created the credential, and the retry conflicted too.
    #[error("credential {name} was modified concurrently")]
    Conflict { name: String },

    /// Encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A stored secret could not be encoded or decoded.
    #[error("corrupt credential data: {0}")]
    Corrupt(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// The change was persisted but its audit events could not be published.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

impl VaultError {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Validation(_)
            | VaultError::TypeMismatch { .. }
            | VaultError::UnsupportedField { .. } => ErrorKind::ValidationFailure,
            VaultError::EntryNotFound | VaultError::InvalidAclOperation => {
                ErrorKind::AuthorizationDenied
            }
            VaultError::CredentialNotFound | VaultError::CaNotFound(_) => ErrorKind::NotFound,
            VaultError::Conflict { .. } => ErrorKind::ConflictRetryable,
            VaultError::Crypto(_) => ErrorKind::CryptoFailure,
            VaultError::Corrupt(_) | VaultError::Store(_) | VaultError::Audit(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Stable reason code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Validation(e) => e.code(),
            VaultError::TypeMismatch { .. } => "error.type_mismatch",
            VaultError::UnsupportedField { .. } => "error.invalid_type",
            VaultError::EntryNotFound | VaultError::CredentialNotFound => {
                "error.credential.invalid_access"
            }
            VaultError::InvalidAclOperation => "error.acl.invalid_update_operation",
            VaultError::CaNotFound(_) => "error.ca_not_found",
            VaultError::Conflict { .. } => "error.conflict",
            VaultError::Crypto(_) => "error.crypto",
            VaultError::Corrupt(_) | VaultError::Store(_) | VaultError::Audit(_) => {
                "error.internal"
            }
        }
    }
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateWrite { name } => VaultError::Conflict { name },
            StoreError::TypeMismatch {
                name,
                existing,
                requested,
            } => VaultError::TypeMismatch {
                name,
                existing,
                requested,
            },
            other => VaultError::Store(other),
        }
    }
}

impl From<PermsError> for VaultError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::EntryNotFound => VaultError::EntryNotFound,
            PermsError::InvalidAclOperation => VaultError::InvalidAclOperation,
            PermsError::Validation(e) => VaultError::Validation(e),
            PermsError::Store(e) => e.into(),
        }
    }
}

impl From<CoreError> for VaultError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Crypto(e) => VaultError::Crypto(e),
            CoreError::Validation(e) => VaultError::Validation(e),
            CoreError::UnsupportedField {
                field,
                credential_type,
            } => VaultError::UnsupportedField {
                field,
                credential_type,
            },
            CoreError::EncodingError(msg) | CoreError::DecodingError(msg) => {
                VaultError::Corrupt(msg)
            }
        }
    }
}

/// Result type for Vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
