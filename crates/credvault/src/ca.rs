//! Certificate authority resolution.
//!
//! A certificate may name the CA it is chained to. Resolution walks to that
//! name's most recent version and hands back only its public certificate,
//! ready to be spliced into the dependent certificate's `ca` field. This is
//! a data lookup: the caller has already authorized the request.

use std::sync::Arc;

use credvault_core::{normalize_name, CertificateValue, VersionMetadata};
use credvault_store::Store;

use crate::error::{Result, VaultError};

/// Looks up certificate authorities by name.
pub struct CertificateAuthorityResolver<S: Store> {
    store: Arc<S>,
}

impl<S: Store> CertificateAuthorityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Public certificate of the CA currently stored under `ca_name`.
    ///
    /// The returned value carries only `certificate`. The CA's private key
    /// and its own `ca` field are never included.
    pub async fn find_active_version(&self, ca_name: &str) -> Result<CertificateValue> {
        let name = normalize_name(ca_name)?;
        let version = self
            .store
            .find_most_recent(&name)
            .await?
            .ok_or_else(|| VaultError::CaNotFound(name.clone()))?;

        match version.metadata() {
            VersionMetadata::Certificate { certificate, .. } => {
                tracing::debug!(ca = %version.name(), version = %version.uuid(), "resolved certificate authority");
                Ok(CertificateValue::new(None, Some(certificate.as_str()), None))
            }
            _ => Err(VaultError::CaNotFound(name)),
        }
    }
}
