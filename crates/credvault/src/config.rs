//! Vault configuration.

use credvault_core::{GenerationParameters, MAX_NAME_LENGTH};

/// Configuration for the [`Vault`](crate::Vault).
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Enforce permission entries. When false every check grants.
    pub acls_enabled: bool,
    /// Longest accepted credential name, in bytes. Capped at [`MAX_NAME_LENGTH`].
    pub max_name_length: usize,
    /// Parameters used when a generate request carries none.
    pub default_generation: GenerationParameters,
    /// Retry a save once when another writer created the credential first.
    pub retry_on_conflict: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            acls_enabled: true,
            max_name_length: MAX_NAME_LENGTH,
            default_generation: GenerationParameters::default(),
            retry_on_conflict: true,
        }
    }
}
