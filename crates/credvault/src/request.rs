//! Write requests and their outcomes.

use credvault_core::{AccessGrant, CredentialType, CredentialValue, CredentialVersion, GenerationParameters};

/// What a write does when the credential already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Always append a new version. The type may change.
    #[default]
    Overwrite,
    /// Leave an existing credential untouched.
    NoOverwrite,
    /// Append only when the new value differs from the current one.
    Converge,
}

/// Store a caller-supplied value.
#[derive(Debug, Clone)]
pub struct SetRequest {
    pub name: String,
    pub value: CredentialValue,
    pub mode: WriteMode,
    /// Entries granted on the credential along with the write.
    pub additional_permissions: Vec<AccessGrant>,
}

impl SetRequest {
    pub fn new(name: impl Into<String>, value: CredentialValue) -> Self {
        Self {
            name: name.into(),
            value,
            mode: WriteMode::default(),
            additional_permissions: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn grant(mut self, grant: AccessGrant) -> Self {
        self.additional_permissions.push(grant);
        self
    }
}

/// Store a freshly generated value.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub name: String,
    pub credential_type: CredentialType,
    /// Falls back to the vault's configured defaults.
    pub parameters: Option<GenerationParameters>,
    /// Username for user credentials. Generated when absent.
    pub username: Option<String>,
    pub mode: WriteMode,
    pub additional_permissions: Vec<AccessGrant>,
}

impl GenerateRequest {
    pub fn new(name: impl Into<String>, credential_type: CredentialType) -> Self {
        Self {
            name: name.into(),
            credential_type,
            parameters: None,
            username: None,
            mode: WriteMode::default(),
            additional_permissions: Vec::new(),
        }
    }

    pub fn password(name: impl Into<String>) -> Self {
        Self::new(name, CredentialType::Password)
    }

    pub fn user(name: impl Into<String>, username: Option<&str>) -> Self {
        let mut request = Self::new(name, CredentialType::User);
        request.username = username.map(str::to_string);
        request
    }

    pub fn parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn grant(mut self, grant: AccessGrant) -> Self {
        self.additional_permissions.push(grant);
        self
    }
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// A new credential was created with its first version.
    Created,
    /// A version was appended to an existing credential.
    Appended,
    /// Nothing was written; `version` is the existing one.
    Unchanged,
}

/// Result of a set, generate or regenerate.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub version: CredentialVersion,
    pub status: WriteStatus,
}

impl WriteOutcome {
    pub fn written(&self) -> bool {
        self.status != WriteStatus::Unchanged
    }
}
