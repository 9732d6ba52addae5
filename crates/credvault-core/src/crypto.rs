//! Envelope encryption for credential secrets.
//!
//! Secrets are sealed with ChaCha20-Poly1305 under a key supplied by a
//! [`KeyProvider`]. Each sealed value records the [`KeyId`] of the key that
//! produced it, so data encrypted before a rotation stays readable.
//!
//! Nonces are generated inside [`EncryptionKey::seal`]; there is no way to
//! encrypt under a caller-chosen nonce.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Identifier of an encryption key, derived from the key material.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub [u8; 32]);

impl KeyId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl TryFrom<&[u8]> for KeyId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A 256-bit symmetric key for ChaCha20-Poly1305.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fingerprint of this key. Never reveals the key material.
    pub fn id(&self) -> KeyId {
        let mut hasher = blake3::Hasher::new_derive_key("credvault-v1-key-id");
        hasher.update(&self.0);
        KeyId(*hasher.finalize().as_bytes())
    }

    /// Encrypt under a freshly generated nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<(EncryptionNonce, Vec<u8>), CryptoError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let nonce = EncryptionNonce::generate();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok((nonce, ciphertext))
    }

    /// Decrypt and authenticate.
    pub fn open(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>, CryptoError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CryptoError::IntegrityCheckFailed)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey({})", self.id())
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce([u8; 12]);

impl EncryptionNonce {
    fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Rebuild a nonce read back from storage.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl TryFrom<&[u8]> for EncryptionNonce {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 12] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Supplies key material to the [`Encryptor`].
pub trait KeyProvider: Send + Sync {
    /// The key new ciphertexts are sealed under.
    fn active_key(&self) -> Result<EncryptionKey, CryptoError>;

    /// Look up a key by id, including retired keys still needed for reads.
    fn key(&self, id: &KeyId) -> Result<EncryptionKey, CryptoError>;
}

/// In-process key provider holding a keyring with one active key.
pub struct StaticKeyProvider {
    inner: RwLock<Keyring>,
}

struct Keyring {
    active: KeyId,
    keys: HashMap<KeyId, EncryptionKey>,
}

impl StaticKeyProvider {
    pub fn new(active: EncryptionKey) -> Self {
        let id = active.id();
        let mut keys = HashMap::new();
        keys.insert(id, active);
        Self {
            inner: RwLock::new(Keyring { active: id, keys }),
        }
    }

    /// A provider with a fresh random key.
    pub fn generate() -> Self {
        Self::new(EncryptionKey::generate())
    }

    /// Make `key` the active key. Previous keys remain available for decryption.
    pub fn rotate(&self, key: EncryptionKey) -> Result<KeyId, CryptoError> {
        let mut ring = self.inner.write().map_err(|_| poisoned())?;
        let id = key.id();
        ring.keys.insert(id, key);
        ring.active = id;
        Ok(id)
    }

    /// Drop a non-active key. Ciphertexts sealed under it become unreadable.
    pub fn retire(&self, id: &KeyId) -> Result<bool, CryptoError> {
        let mut ring = self.inner.write().map_err(|_| poisoned())?;
        if ring.active == *id {
            return Err(CryptoError::KeyUnavailable(
                "the active key cannot be retired".into(),
            ));
        }
        Ok(ring.keys.remove(id).is_some())
    }

    pub fn active_key_id(&self) -> Result<KeyId, CryptoError> {
        Ok(self.inner.read().map_err(|_| poisoned())?.active)
    }
}

impl KeyProvider for StaticKeyProvider {
    fn active_key(&self) -> Result<EncryptionKey, CryptoError> {
        let ring = self.inner.read().map_err(|_| poisoned())?;
        ring.keys
            .get(&ring.active)
            .cloned()
            .ok_or_else(|| CryptoError::KeyUnavailable(format!("active key {}", ring.active)))
    }

    fn key(&self, id: &KeyId) -> Result<EncryptionKey, CryptoError> {
        let ring = self.inner.read().map_err(|_| poisoned())?;
        ring.keys
            .get(id)
            .cloned()
            .ok_or_else(|| CryptoError::KeyUnavailable(format!("key {}", id)))
    }
}

fn poisoned() -> CryptoError {
    CryptoError::KeyUnavailable("keyring lock poisoned".into())
}

/// Ciphertext together with the nonce and key that produced it.
///
/// Only [`Encryptor::encrypt`] creates new values; [`EncryptedValue::from_parts`]
/// exists so storage backends can rebuild what they persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue {
    key_id: KeyId,
    nonce: EncryptionNonce,
    ciphertext: Vec<u8>,
}

impl EncryptedValue {
    pub fn from_parts(key_id: KeyId, nonce: EncryptionNonce, ciphertext: Vec<u8>) -> Self {
        Self {
            key_id,
            nonce,
            ciphertext,
        }
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub fn nonce(&self) -> &EncryptionNonce {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Stateless encrypt/decrypt over a [`KeyProvider`].
///
/// Cheap to clone; one instance serves every credential type.
#[derive(Clone)]
pub struct Encryptor {
    keys: Arc<dyn KeyProvider>,
}

impl Encryptor {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedValue, CryptoError> {
        let key = self.keys.active_key()?;
        let (nonce, ciphertext) = key.seal(plaintext)?;
        Ok(EncryptedValue {
            key_id: key.id(),
            nonce,
            ciphertext,
        })
    }

    pub fn decrypt(&self, value: &EncryptedValue) -> Result<Vec<u8>, CryptoError> {
        let key = self.keys.key(&value.key_id)?;
        key.open(&value.ciphertext, &value.nonce)
    }

    /// Id of the key [`Encryptor::encrypt`] currently uses.
    pub fn active_key_id(&self) -> Result<KeyId, CryptoError> {
        Ok(self.keys.active_key()?.id())
    }
}

impl fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryptor").finish_non_exhaustive()
    }
}
