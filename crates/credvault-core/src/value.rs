//! Cleartext credential values.
//!
//! [`CredentialValue`] is the tagged union callers hand in on writes and get
//! back on reads. Optional fields of the key-pair and certificate types are
//! plain `String`s: an absent field reads back as `""`, never as a null.

use std::fmt;

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
    Engine,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::CredentialType;

const REDACTED: &str = "[REDACTED]";

/// Cleartext value of one credential version.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CredentialValue {
    Value(String),
    Password(String),
    Certificate(CertificateValue),
    Ssh(SshValue),
    Rsa(RsaValue),
    Json(serde_json::Value),
    User(UserValue),
}

impl CredentialValue {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            CredentialValue::Value(_) => CredentialType::Value,
            CredentialValue::Password(_) => CredentialType::Password,
            CredentialValue::Certificate(_) => CredentialType::Certificate,
            CredentialValue::Ssh(_) => CredentialType::Ssh,
            CredentialValue::Rsa(_) => CredentialType::Rsa,
            CredentialValue::Json(_) => CredentialType::Json,
            CredentialValue::User(_) => CredentialType::User,
        }
    }

    pub fn as_certificate(&self) -> Option<&CertificateValue> {
        match self {
            CredentialValue::Certificate(c) => Some(c),
            _ => None,
        }
    }

    /// The password of a password or user credential.
    pub fn password(&self) -> Option<&str> {
        match self {
            CredentialValue::Password(p) => Some(p),
            CredentialValue::User(u) => Some(&u.password),
            _ => None,
        }
    }
}

impl fmt::Debug for CredentialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialValue::Value(_) => f.debug_tuple("Value").field(&REDACTED).finish(),
            CredentialValue::Password(_) => f.debug_tuple("Password").field(&REDACTED).finish(),
            CredentialValue::Certificate(c) => f.debug_tuple("Certificate").field(c).finish(),
            CredentialValue::Ssh(v) => f.debug_tuple("Ssh").field(v).finish(),
            CredentialValue::Rsa(v) => f.debug_tuple("Rsa").field(v).finish(),
            CredentialValue::Json(_) => f.debug_tuple("Json").field(&REDACTED).finish(),
            CredentialValue::User(v) => f.debug_tuple("User").field(v).finish(),
        }
    }
}

/// A certificate, optionally chained to a named CA credential.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateValue {
    pub ca: String,
    pub certificate: String,
    pub private_key: String,
    /// Name of the CA credential this certificate is signed by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_name: Option<String>,
}

impl CertificateValue {
    /// Build from optional parts. Missing parts become empty strings.
    pub fn new(ca: Option<&str>, certificate: Option<&str>, private_key: Option<&str>) -> Self {
        Self {
            ca: ca.unwrap_or_default().to_string(),
            certificate: certificate.unwrap_or_default().to_string(),
            private_key: private_key.unwrap_or_default().to_string(),
            ca_name: None,
        }
    }

    pub fn with_ca_name(mut self, ca_name: impl Into<String>) -> Self {
        self.ca_name = Some(ca_name.into());
        self
    }

    /// True when none of ca, certificate, private key carries data.
    pub fn is_empty(&self) -> bool {
        self.ca.is_empty() && self.certificate.is_empty() && self.private_key.is_empty()
    }
}

impl fmt::Debug for CertificateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateValue")
            .field("ca", &self.ca)
            .field("certificate", &self.certificate)
            .field("private_key", &REDACTED)
            .field("ca_name", &self.ca_name)
            .finish()
    }
}

/// An SSH key pair in OpenSSH encoding.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshValue {
    pub public_key: String,
    pub private_key: String,
}

impl SshValue {
    pub fn new(public_key: Option<&str>, private_key: Option<&str>) -> Self {
        Self {
            public_key: public_key.unwrap_or_default().to_string(),
            private_key: private_key.unwrap_or_default().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.public_key.is_empty() && self.private_key.is_empty()
    }

    /// SHA-256 fingerprint of the public key, as unpadded base64.
    ///
    /// `None` when there is no public key or it is not a parseable
    /// `<type> <base64 blob> [comment]` line.
    pub fn public_key_fingerprint(&self) -> Option<String> {
        let blob = self.public_key.split_whitespace().nth(1)?;
        let decoded = STANDARD.decode(blob).ok()?;
        Some(STANDARD_NO_PAD.encode(Sha256::digest(&decoded)))
    }
}

impl fmt::Debug for SshValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshValue")
            .field("public_key", &self.public_key)
            .field("private_key", &REDACTED)
            .finish()
    }
}

/// An RSA key pair in PEM encoding.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaValue {
    pub public_key: String,
    pub private_key: String,
}

impl RsaValue {
    pub fn new(public_key: Option<&str>, private_key: Option<&str>) -> Self {
        Self {
            public_key: public_key.unwrap_or_default().to_string(),
            private_key: private_key.unwrap_or_default().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.public_key.is_empty() && self.private_key.is_empty()
    }
}

impl fmt::Debug for RsaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaValue")
            .field("public_key", &self.public_key)
            .field("private_key", &REDACTED)
            .finish()
    }
}

/// A username and password pair.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserValue {
    pub username: String,
    pub password: String,
}

impl UserValue {
    pub fn new(username: Option<&str>, password: &str) -> Self {
        Self {
            username: username.unwrap_or_default().to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for UserValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserValue")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// How a password was generated, kept so it can be regenerated later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub length: usize,
    pub exclude_upper: bool,
    pub exclude_lower: bool,
    pub exclude_number: bool,
    pub include_special: bool,
}

impl GenerationParameters {
    pub const DEFAULT_LENGTH: usize = 30;
    pub const MIN_LENGTH: usize = 4;
    pub const MAX_LENGTH: usize = 200;
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            length: Self::DEFAULT_LENGTH,
            exclude_upper: false,
            exclude_lower: false,
            exclude_number: false,
            include_special: false,
        }
    }
}
