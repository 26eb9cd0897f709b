//! Holder identifiers and identifier selection.
//!
//! A wallet typically holds several identifiers (DIDs) backed by different
//! key stores, not all of them FIPS compliant. The factory picks the right
//! identifier for a signing operation given the operation's crypto
//! requirements, preferring FIPS-compliant material when several qualify.

use serde::{Deserialize, Serialize};

/// Identifier selection failure.
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// No held identifier satisfies the crypto requirement.
    #[error("no identifier satisfies the crypto requirement")]
    NoSuitableIdentifier,

    /// No identifier is bound to the given DID.
    #[error("no identifier found for did `{0}`")]
    UnknownDid(String),
}

/// A decentralized identifier the holder controls, with a reference to its
/// signing key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HolderIdentifier {
    /// The DID string, e.g. `did:jwk:...` or `did:web:...`.
    pub did: String,
    /// Opaque key-store reference for the signing key.
    pub signature_key_reference: String,
    /// JWS algorithm the key signs with.
    pub algorithm: String,
    /// Whether the backing key store is FIPS 140 compliant.
    pub fips_compliant: bool,
}

impl HolderIdentifier {
    pub fn new(
        did: impl Into<String>,
        signature_key_reference: impl Into<String>,
        algorithm: impl Into<String>,
        fips_compliant: bool,
    ) -> Self {
        Self {
            did: did.into(),
            signature_key_reference: signature_key_reference.into(),
            algorithm: algorithm.into(),
            fips_compliant,
        }
    }

    /// The verification-method id used as the JWS `kid`: the DID followed by
    /// the key reference as a fragment.
    pub fn key_id(&self) -> String {
        let fragment = self.signature_key_reference.trim_start_matches('#');
        format!("{}#{fragment}", self.did)
    }
}

/// A predicate over identifiers, expressing what a signing operation needs
/// from the underlying crypto.
pub trait CryptoRequirement {
    fn is_supported(&self, identifier: &HolderIdentifier) -> bool;
}

/// Accepts any identifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnyCrypto;

impl CryptoRequirement for AnyCrypto {
    fn is_supported(&self, _identifier: &HolderIdentifier) -> bool {
        true
    }
}

/// Accepts identifiers signing with one of the listed JWS algorithms.
#[derive(Debug, Clone)]
pub struct AlgorithmRequirement {
    pub algorithms: Vec<String>,
}

impl AlgorithmRequirement {
    pub fn new(algorithms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            algorithms: algorithms.into_iter().map(Into::into).collect(),
        }
    }
}

impl CryptoRequirement for AlgorithmRequirement {
    fn is_supported(&self, identifier: &HolderIdentifier) -> bool {
        self.algorithms.iter().any(|a| *a == identifier.algorithm)
    }
}

/// Selects identifiers for signing operations, FIPS-compliant first.
#[derive(Debug, Clone, Default)]
pub struct IdentifierFactory {
    identifiers: Vec<HolderIdentifier>,
}

impl IdentifierFactory {
    /// Build a factory over the wallet's identifiers. The relative order of
    /// identifiers with equal FIPS standing is preserved, so callers control
    /// the tie-break by their input ordering.
    pub fn new(mut identifiers: Vec<HolderIdentifier>) -> Self {
        identifiers.sort_by_key(|identifier| !identifier.fips_compliant);
        Self { identifiers }
    }

    /// The preferred identifier satisfying the given requirement.
    pub fn identifier_for(
        &self,
        requirement: &impl CryptoRequirement,
    ) -> Result<&HolderIdentifier, IdentifierError> {
        self.identifiers
            .iter()
            .find(|identifier| requirement.is_supported(identifier))
            .ok_or(IdentifierError::NoSuitableIdentifier)
    }

    /// The identifier bound to a specific DID, used when a response must be
    /// signed by the same subject that holds a credential.
    pub fn identifier_for_did(&self, did: &str) -> Result<&HolderIdentifier, IdentifierError> {
        self.identifiers
            .iter()
            .find(|identifier| identifier.did == did)
            .ok_or_else(|| IdentifierError::UnknownDid(did.to_string()))
    }

    /// The wallet's primary identifier.
    pub fn master(&self) -> Result<&HolderIdentifier, IdentifierError> {
        self.identifiers
            .first()
            .ok_or(IdentifierError::NoSuitableIdentifier)
    }
}
