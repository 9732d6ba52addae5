//! Structural validation of credential values and generation parameters.

use crate::error::ValidationError;
use crate::types::CredentialType;
use crate::value::{CredentialValue, GenerationParameters};

/// Validate a cleartext value before it is encrypted.
///
/// Certificate, SSH and RSA values may omit any of their fields but not all
/// of them.
pub fn validate_value(value: &CredentialValue) -> Result<(), ValidationError> {
    match value {
        CredentialValue::Value(v) if v.is_empty() => Err(ValidationError::MissingValue),
        CredentialValue::Password(p) if p.is_empty() => Err(ValidationError::MissingPassword),
        CredentialValue::User(u) if u.password.is_empty() => {
            Err(ValidationError::MissingPassword)
        }
        CredentialValue::Certificate(c) if c.is_empty() => {
            Err(ValidationError::MissingCredentialFields {
                credential_type: CredentialType::Certificate,
            })
        }
        CredentialValue::Ssh(s) if s.is_empty() => Err(ValidationError::MissingCredentialFields {
            credential_type: CredentialType::Ssh,
        }),
        CredentialValue::Rsa(r) if r.is_empty() => Err(ValidationError::MissingCredentialFields {
            credential_type: CredentialType::Rsa,
        }),
        CredentialValue::Json(doc) if !doc.is_object() => Err(ValidationError::InvalidJsonValue),
        _ => Ok(()),
    }
}

/// Validate password generation parameters.
pub fn validate_generation(params: &GenerationParameters) -> Result<(), ValidationError> {
    if !(GenerationParameters::MIN_LENGTH..=GenerationParameters::MAX_LENGTH)
        .contains(&params.length)
    {
        return Err(ValidationError::InvalidLength {
            length: params.length,
            min: GenerationParameters::MIN_LENGTH,
            max: GenerationParameters::MAX_LENGTH,
        });
    }

    if params.exclude_upper
        && params.exclude_lower
        && params.exclude_number
        && !params.include_special
    {
        return Err(ValidationError::NoCharacterClasses);
    }

    Ok(())
}
