//! Error types for credvault core.

use thiserror::Error;

use crate::types::CredentialType;

/// Failures of the envelope encryption layer.
///
/// `KeyUnavailable` and `IntegrityCheckFailed` are kept apart so callers can
/// tell an unreachable key store from tampered ciphertext or a wrong key.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("integrity check failed: ciphertext was tampered with or the key is wrong")]
    IntegrityCheckFailed,

    #[error("encryption error: {0}")]
    Encryption(String),
}

/// User-correctable validation failures.
///
/// Every variant carries a machine-checkable reason code, see [`ValidationError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a credential name must be provided")]
    MissingName,

    #[error("invalid credential name: {0}")]
    InvalidName(String),

    #[error("credential name exceeds the maximum length of {max} bytes")]
    NameTooLong { max: usize },

    #[error("at least one {credential_type} field must be provided")]
    MissingCredentialFields { credential_type: CredentialType },

    #[error("a value must be provided")]
    MissingValue,

    #[error("a password must be provided")]
    MissingPassword,

    #[error("a json credential value must be an object")]
    InvalidJsonValue,

    #[error("unknown credential type: {0}")]
    UnknownType(String),

    #[error("unknown permission operation: {0}")]
    UnknownOperation(String),

    #[error("credentials of type {0} cannot be generated")]
    UnsupportedGenerationType(CredentialType),

    #[error("password length must be between {min} and {max}, got {length}")]
    InvalidLength { length: usize, min: usize, max: usize },

    #[error("generation parameters exclude every character class")]
    NoCharacterClasses,

    #[error("credential {0} was not generated and cannot be regenerated")]
    CannotRegenerate(String),

    #[error("the credential type cannot be changed from {existing} to {requested}")]
    TypeChange {
        existing: CredentialType,
        requested: CredentialType,
    },
}

impl ValidationError {
    /// Reason code reported alongside the error.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingName => "error.missing_name",
            ValidationError::InvalidName(_) => "error.invalid_name",
            ValidationError::NameTooLong { .. } => "error.name_has_too_many_characters",
            ValidationError::MissingCredentialFields { credential_type } => {
                match credential_type {
                    CredentialType::Certificate => "error.missing_certificate_credentials",
                    CredentialType::Ssh => "error.missing_ssh_credentials",
                    _ => "error.missing_rsa_credentials",
                }
            }
            ValidationError::MissingValue => "error.missing_value",
            ValidationError::MissingPassword => "error.missing_password",
            ValidationError::InvalidJsonValue => "error.invalid_json_value",
            ValidationError::UnknownType(_) => "error.invalid_type",
            ValidationError::UnknownOperation(_) => "error.permission.invalid_operation",
            ValidationError::UnsupportedGenerationType(_) => "error.invalid_generate_type",
            ValidationError::InvalidLength { .. } => "error.invalid_password_length",
            ValidationError::NoCharacterClasses => "error.excludes_all_charsets",
            ValidationError::CannotRegenerate(_) => {
                "error.cannot_regenerate_non_generated_credentials"
            }
            ValidationError::TypeChange { .. } => "error.type_mismatch",
        }
    }
}

/// Errors raised while building or reading credential versions.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{field} is not a field of {credential_type} credentials")]
    UnsupportedField {
        field: &'static str,
        credential_type: CredentialType,
    },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
