//! Strong type definitions shared across credvault crates.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// The concrete type of a credential. Fixed for the lifetime of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Value,
    Password,
    Certificate,
    Ssh,
    Rsa,
    Json,
    User,
}

impl CredentialType {
    /// All credential types, in declaration order.
    pub const ALL: [CredentialType; 7] = [
        CredentialType::Value,
        CredentialType::Password,
        CredentialType::Certificate,
        CredentialType::Ssh,
        CredentialType::Rsa,
        CredentialType::Json,
        CredentialType::User,
    ];

    /// Lowercase name, as stored and as accepted from requests.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CredentialType::Value => "value",
            CredentialType::Password => "password",
            CredentialType::Certificate => "certificate",
            CredentialType::Ssh => "ssh",
            CredentialType::Rsa => "rsa",
            CredentialType::Json => "json",
            CredentialType::User => "user",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialType {
    type Err = ValidationError;

    /// Parses a type name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CredentialType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownType(s.to_string()))
    }
}

/// A named secret identity. Versions hang off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Stable identifier, never reused.
    pub uuid: Uuid,
    /// Normalized absolute name. Unique ignoring case.
    pub name: String,
    /// Creation time (Unix ms).
    pub created_at: i64,
}

impl Credential {
    pub fn new(uuid: Uuid, name: impl Into<String>, created_at: i64) -> Self {
        Self {
            uuid,
            name: name.into(),
            created_at,
        }
    }
}

/// An operation an actor may be allowed to perform on a credential path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOperation {
    Read,
    Write,
    Delete,
    ReadAcl,
    WriteAcl,
}

impl PermissionOperation {
    pub const ALL: [PermissionOperation; 5] = [
        PermissionOperation::Read,
        PermissionOperation::Write,
        PermissionOperation::Delete,
        PermissionOperation::ReadAcl,
        PermissionOperation::WriteAcl,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PermissionOperation::Read => "read",
            PermissionOperation::Write => "write",
            PermissionOperation::Delete => "delete",
            PermissionOperation::ReadAcl => "read_acl",
            PermissionOperation::WriteAcl => "write_acl",
        }
    }

    /// Bit used when an operation set is packed into an integer.
    pub const fn bit(&self) -> u8 {
        match self {
            PermissionOperation::Read => 1,
            PermissionOperation::Write => 1 << 1,
            PermissionOperation::Delete => 1 << 2,
            PermissionOperation::ReadAcl => 1 << 3,
            PermissionOperation::WriteAcl => 1 << 4,
        }
    }

    /// Every operation, as granted to the originator of a credential.
    pub fn all() -> BTreeSet<PermissionOperation> {
        PermissionOperation::ALL.into_iter().collect()
    }

    /// Pack a set of operations into a bitmask.
    pub fn to_mask(ops: &BTreeSet<PermissionOperation>) -> u8 {
        ops.iter().fold(0, |mask, op| mask | op.bit())
    }

    /// Unpack a bitmask produced by [`PermissionOperation::to_mask`].
    pub fn from_mask(mask: u8) -> BTreeSet<PermissionOperation> {
        PermissionOperation::ALL
            .into_iter()
            .filter(|op| mask & op.bit() != 0)
            .collect()
    }
}

impl fmt::Display for PermissionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionOperation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionOperation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownOperation(s.to_string()))
    }
}

/// A set of operations granted to one actor, not yet bound to a path.
///
/// This is what write requests carry as additional permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub actor: String,
    pub operations: BTreeSet<PermissionOperation>,
}

impl AccessGrant {
    pub fn new(
        actor: impl Into<String>,
        operations: impl IntoIterator<Item = PermissionOperation>,
    ) -> Self {
        Self {
            actor: actor.into(),
            operations: operations.into_iter().collect(),
        }
    }

    /// Bind this grant to a path.
    pub fn at(&self, path: impl Into<String>) -> PermissionEntry {
        PermissionEntry {
            path: path.into(),
            actor: self.actor.clone(),
            operations: self.operations.clone(),
        }
    }
}

/// An (path, actor, operations) authorization grant.
///
/// `path` is either a full credential name (`/a/b/c`) or an ancestor
/// prefix ending in `/` (`/a/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub path: String,
    pub actor: String,
    pub operations: BTreeSet<PermissionOperation>,
}

impl PermissionEntry {
    pub fn new(
        path: impl Into<String>,
        actor: impl Into<String>,
        operations: impl IntoIterator<Item = PermissionOperation>,
    ) -> Self {
        Self {
            path: path.into(),
            actor: actor.into(),
            operations: operations.into_iter().collect(),
        }
    }

    /// Whether this entry grants `op`.
    pub fn allows(&self, op: PermissionOperation) -> bool {
        self.operations.contains(&op)
    }
}
