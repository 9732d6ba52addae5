//! # credvault Core
//!
//! Pure primitives for credvault: typed credential values, encrypted
//! credential versions, and the credential path hierarchy.
//!
//! This crate contains no I/O and no storage. It is computation over
//! credential data and its envelope encryption.
//!
//! ## Key Types
//!
//! - [`CredentialValue`] - Cleartext tagged union over the seven credential types
//! - [`CredentialVersion`] - One immutable, encrypted snapshot of a credential
//! - [`VersionBuilder`] - Validates, splits and seals a value into a version
//! - [`Encryptor`] - ChaCha20-Poly1305 envelope encryption over a [`KeyProvider`]
//! - [`PermissionEntry`] - An (path, actor, operations) grant
//!
//! ## Paths
//!
//! Names are absolute, slash-delimited and unique ignoring case. See [`path`]
//! for normalization and ancestor derivation.

pub mod crypto;
pub mod error;
pub mod ids;
pub mod path;
pub mod types;
pub mod validation;
pub mod value;
pub mod version;

pub use crypto::{
    EncryptedValue, EncryptionKey, EncryptionNonce, Encryptor, KeyId, KeyProvider,
    StaticKeyProvider,
};
pub use error::{CoreError, CryptoError, Result, ValidationError};
pub use ids::{
    Clock, FixedClock, RandomUuidGenerator, SequentialUuidGenerator, SystemClock, UuidGenerator,
};
pub use path::{
    ancestor_paths, normalize_name, normalize_path, permission_key, same_name, MAX_NAME_LENGTH,
};
pub use types::{AccessGrant, Credential, CredentialType, PermissionEntry, PermissionOperation};
pub use validation::{validate_generation, validate_value};
pub use value::{
    CertificateValue, CredentialValue, GenerationParameters, RsaValue, SshValue, UserValue,
};
pub use version::{CredentialVersion, VersionBuilder, VersionMetadata};
