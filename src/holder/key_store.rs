//! Key storage behind an async trait.
//!
//! Platform integrations back this with secure hardware or an OS keychain;
//! the in-memory store exists for tests and ephemeral wallet sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use p256::ecdsa::SigningKey;

use crate::holder::jose::Jwk;

/// Key resolution failure.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    /// No key is stored under the given reference.
    #[error("no key found for reference `{0}`")]
    KeyNotFound(String),

    /// The backing store failed.
    #[error("key store failure: {0}")]
    Other(String),
}

/// Resolves opaque key references to key material.
///
/// References are the `signature_key_reference` values carried by
/// [HolderIdentifier](crate::holder::identifier::HolderIdentifier)s; the
/// store decides what they mean.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Resolve a key reference to its JWK, private material included.
    async fn key(&self, reference: &str) -> Result<Jwk, KeyStoreError>;
}

/// A [KeyStore] over an in-memory map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyStore {
    keys: HashMap<String, Jwk>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a key under a reference, replacing any previous binding.
    pub fn insert(&mut self, reference: impl Into<String>, key: Jwk) {
        self.keys.insert(reference.into(), key);
    }

    /// Generate a fresh P-256 key under a reference and return its public
    /// half.
    pub fn generate(&mut self, reference: impl Into<String>) -> Jwk {
        let key = Jwk::from_p256(&SigningKey::random(&mut rand::thread_rng()), None);
        let public = key.public();
        self.insert(reference, key);
        public
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn key(&self, reference: &str) -> Result<Jwk, KeyStoreError> {
        self.keys
            .get(reference)
            .cloned()
            .ok_or_else(|| KeyStoreError::KeyNotFound(reference.to_string()))
    }
}
