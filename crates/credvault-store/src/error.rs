//! Error types for the store module.

use credvault_core::CredentialType;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Another writer created a credential with this name first.
    ///
    /// Retryable: re-resolve the existing credential and append to it.
    #[error("credential {name} was created concurrently")]
    DuplicateWrite { name: String },

    /// The credential exists with a different type and overwrite was not authorized.
    #[error("credential {name} is of type {existing}, not {requested}")]
    TypeMismatch {
        name: String,
        existing: CredentialType,
        requested: CredentialType,
    },

    /// Metadata serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Store lock poisoned or background task failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
