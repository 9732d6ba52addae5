//! Credential versions: one immutable, typed, encrypted snapshot of a value.
//!
//! A version splits its [`CredentialValue`] into two parts:
//!
//! - the secret (password, private key, JSON document, ...), CBOR-encoded and
//!   sealed by the [`Encryptor`] the moment the version is built;
//! - cleartext [`VersionMetadata`] (certificate chain, public keys, CA name,
//!   generation parameters) that lookups and regeneration need without a key.
//!
//! The metadata variant doubles as the type tag and never changes after
//! construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{EncryptedValue, Encryptor};
use crate::error::{CoreError, Result, ValidationError};
use crate::types::{Credential, CredentialType};
use crate::validation::{validate_generation, validate_value};
use crate::value::{
    CertificateValue, CredentialValue, GenerationParameters, RsaValue, SshValue, UserValue,
};

/// Cleartext, type-specific fields stored next to the encrypted secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VersionMetadata {
    Value,
    Password {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation: Option<GenerationParameters>,
    },
    Certificate {
        ca: String,
        certificate: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ca_name: Option<String>,
    },
    Ssh {
        public_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_key_fingerprint: Option<String>,
    },
    Rsa {
        public_key: String,
    },
    Json,
    User {
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generation: Option<GenerationParameters>,
    },
}

impl VersionMetadata {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            VersionMetadata::Value => CredentialType::Value,
            VersionMetadata::Password { .. } => CredentialType::Password,
            VersionMetadata::Certificate { .. } => CredentialType::Certificate,
            VersionMetadata::Ssh { .. } => CredentialType::Ssh,
            VersionMetadata::Rsa { .. } => CredentialType::Rsa,
            VersionMetadata::Json => CredentialType::Json,
            VersionMetadata::User { .. } => CredentialType::User,
        }
    }
}

/// The encrypted half of a version, before sealing.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Secret {
    Text(String),
    Json(String),
}

impl Secret {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    fn into_text(self) -> Result<String> {
        match self {
            Secret::Text(s) => Ok(s),
            Secret::Json(_) => Err(CoreError::DecodingError(
                "expected a text secret, found a json document".into(),
            )),
        }
    }
}

fn split(
    value: CredentialValue,
    generation: Option<GenerationParameters>,
) -> Result<(VersionMetadata, Secret)> {
    let parts = match value {
        CredentialValue::Value(v) => (VersionMetadata::Value, Secret::Text(v)),
        CredentialValue::Password(p) => (VersionMetadata::Password { generation }, Secret::Text(p)),
        CredentialValue::Certificate(c) => (
            VersionMetadata::Certificate {
                ca: c.ca,
                certificate: c.certificate,
                ca_name: c.ca_name,
            },
            Secret::Text(c.private_key),
        ),
        CredentialValue::Ssh(s) => {
            let public_key_fingerprint = s.public_key_fingerprint();
            (
                VersionMetadata::Ssh {
                    public_key: s.public_key,
                    public_key_fingerprint,
                },
                Secret::Text(s.private_key),
            )
        }
        CredentialValue::Rsa(r) => (
            VersionMetadata::Rsa {
                public_key: r.public_key,
            },
            Secret::Text(r.private_key),
        ),
        CredentialValue::Json(doc) => {
            let encoded = serde_json::to_string(&doc)
                .map_err(|e| CoreError::EncodingError(e.to_string()))?;
            (VersionMetadata::Json, Secret::Json(encoded))
        }
        CredentialValue::User(u) => (
            VersionMetadata::User {
                username: u.username,
                generation,
            },
            Secret::Text(u.password),
        ),
    };
    Ok(parts)
}

fn join(metadata: &VersionMetadata, secret: Secret) -> Result<CredentialValue> {
    let value = match metadata {
        VersionMetadata::Value => CredentialValue::Value(secret.into_text()?),
        VersionMetadata::Password { .. } => CredentialValue::Password(secret.into_text()?),
        VersionMetadata::Certificate {
            ca,
            certificate,
            ca_name,
        } => CredentialValue::Certificate(CertificateValue {
            ca: ca.clone(),
            certificate: certificate.clone(),
            private_key: secret.into_text()?,
            ca_name: ca_name.clone(),
        }),
        VersionMetadata::Ssh { public_key, .. } => CredentialValue::Ssh(SshValue {
            public_key: public_key.clone(),
            private_key: secret.into_text()?,
        }),
        VersionMetadata::Rsa { public_key } => CredentialValue::Rsa(RsaValue {
            public_key: public_key.clone(),
            private_key: secret.into_text()?,
        }),
        VersionMetadata::Json => match secret {
            Secret::Json(doc) => CredentialValue::Json(
                serde_json::from_str(&doc).map_err(|e| CoreError::DecodingError(e.to_string()))?,
            ),
            Secret::Text(_) => {
                return Err(CoreError::DecodingError(
                    "expected a json document, found a text secret".into(),
                ))
            }
        },
        VersionMetadata::User { username, .. } => CredentialValue::User(UserValue {
            username: username.clone(),
            password: secret.into_text()?,
        }),
    };
    Ok(value)
}

/// One immutable snapshot of a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialVersion {
    uuid: Uuid,
    credential: Credential,
    metadata: VersionMetadata,
    encrypted: EncryptedValue,
    created_at: i64,
}

impl CredentialVersion {
    /// Rebuild a version read back from storage.
    pub fn from_parts(
        uuid: Uuid,
        credential: Credential,
        metadata: VersionMetadata,
        encrypted: EncryptedValue,
        created_at: i64,
    ) -> Self {
        Self {
            uuid,
            credential,
            metadata,
            encrypted,
            created_at,
        }
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn name(&self) -> &str {
        &self.credential.name
    }

    pub fn credential_type(&self) -> CredentialType {
        self.metadata.credential_type()
    }

    pub fn metadata(&self) -> &VersionMetadata {
        &self.metadata
    }

    pub fn encrypted(&self) -> &EncryptedValue {
        &self.encrypted
    }

    /// Creation time (Unix ms).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// CA this certificate is chained to, if any.
    pub fn ca_name(&self) -> Option<&str> {
        match &self.metadata {
            VersionMetadata::Certificate { ca_name, .. } => ca_name.as_deref(),
            _ => None,
        }
    }

    /// Parameters a password or user credential was generated with.
    pub fn generation_parameters(&self) -> Option<&GenerationParameters> {
        match &self.metadata {
            VersionMetadata::Password { generation } | VersionMetadata::User { generation, .. } => {
                generation.as_ref()
            }
            _ => None,
        }
    }

    /// Decrypt the secret and reassemble the cleartext value.
    pub fn decrypt(&self, encryptor: &Encryptor) -> Result<CredentialValue> {
        let plaintext = encryptor.decrypt(&self.encrypted)?;
        join(&self.metadata, Secret::from_bytes(&plaintext)?)
    }

    /// A new, unpersisted version carrying this one's credential, metadata,
    /// ciphertext and nonce. Type-specific setters then overwrite only the
    /// fields being changed.
    pub fn successor(&self, uuid: Uuid, created_at: i64) -> Self {
        Self {
            uuid,
            credential: self.credential.clone(),
            metadata: self.metadata.clone(),
            encrypted: self.encrypted.clone(),
            created_at,
        }
    }

    /// Move an unpersisted version under another credential identity.
    pub fn rebind(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Replace the password of a password or user credential.
    pub fn set_password(&mut self, password: &str, encryptor: &Encryptor) -> Result<()> {
        match self.metadata {
            VersionMetadata::Password { .. } | VersionMetadata::User { .. } => {
                self.seal_text(password, encryptor)
            }
            _ => Err(self.unsupported("password")),
        }
    }

    /// Replace the private key of a certificate or key pair.
    pub fn set_private_key(&mut self, private_key: &str, encryptor: &Encryptor) -> Result<()> {
        match self.metadata {
            VersionMetadata::Certificate { .. }
            | VersionMetadata::Ssh { .. }
            | VersionMetadata::Rsa { .. } => self.seal_text(private_key, encryptor),
            _ => Err(self.unsupported("private_key")),
        }
    }

    /// Replace the CA certificate of a certificate credential.
    pub fn set_ca(&mut self, ca_certificate: impl Into<String>) -> Result<()> {
        if let VersionMetadata::Certificate { ca, .. } = &mut self.metadata {
            *ca = ca_certificate.into();
            return Ok(());
        }
        Err(self.unsupported("ca"))
    }

    /// Re-encrypt the secret under the active key with a fresh nonce.
    pub fn reseal(&mut self, encryptor: &Encryptor) -> Result<()> {
        let plaintext = encryptor.decrypt(&self.encrypted)?;
        self.encrypted = encryptor.encrypt(&plaintext)?;
        Ok(())
    }

    fn seal_text(&mut self, text: &str, encryptor: &Encryptor) -> Result<()> {
        let bytes = Secret::Text(text.to_string()).to_bytes()?;
        self.encrypted = encryptor.encrypt(&bytes)?;
        Ok(())
    }

    fn unsupported(&self, field: &'static str) -> CoreError {
        CoreError::UnsupportedField {
            field,
            credential_type: self.credential_type(),
        }
    }
}

/// Builder for new credential versions.
///
/// ```rust
/// use std::sync::Arc;
/// use credvault_core::{Credential, CredentialValue, Encryptor, StaticKeyProvider, VersionBuilder};
/// use uuid::Uuid;
///
/// let encryptor = Encryptor::new(Arc::new(StaticKeyProvider::generate()));
/// let credential = Credential::new(Uuid::new_v4(), "/a/cred", 1_700_000_000_000);
/// let version = VersionBuilder::new(credential, Uuid::new_v4())
///     .timestamp(1_700_000_000_000)
///     .value(CredentialValue::Password("test-password".into()))
///     .seal(&encryptor)
///     .unwrap();
/// assert_eq!(version.decrypt(&encryptor).unwrap().password(), Some("test-password"));
/// ```
pub struct VersionBuilder {
    credential: Credential,
    uuid: Uuid,
    created_at: i64,
    value: Option<CredentialValue>,
    generation: Option<GenerationParameters>,
}

impl VersionBuilder {
    pub fn new(credential: Credential, uuid: Uuid) -> Self {
        let created_at = credential.created_at;
        Self {
            credential,
            uuid,
            created_at,
            value: None,
            generation: None,
        }
    }

    /// Creation time (Unix ms). Defaults to the credential's creation time.
    pub fn timestamp(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn value(mut self, value: CredentialValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Record how a password or user credential was generated.
    pub fn generation(mut self, params: Option<GenerationParameters>) -> Self {
        self.generation = params;
        self
    }

    /// Validate, split and encrypt.
    pub fn seal(self, encryptor: &Encryptor) -> Result<CredentialVersion> {
        let value = self.value.ok_or(ValidationError::MissingValue)?;
        validate_value(&value)?;

        if let Some(params) = &self.generation {
            match value.credential_type() {
                CredentialType::Password | CredentialType::User => validate_generation(params)?,
                other => {
                    return Err(CoreError::UnsupportedField {
                        field: "generation",
                        credential_type: other,
                    })
                }
            }
        }

        let (metadata, secret) = split(value, self.generation)?;
        let encrypted = encryptor.encrypt(&secret.to_bytes()?)?;

        Ok(CredentialVersion {
            uuid: self.uuid,
            credential: self.credential,
            metadata,
            encrypted,
            created_at: self.created_at,
        })
    }
}
