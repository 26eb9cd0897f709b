#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use base64::prelude::*;
use serde_json::json;
use verified_id_wallet::core::verified_id::{VerifiableCredential, VerifiedId};
use verified_id_wallet::holder::identifier::HolderIdentifier;
use verified_id_wallet::holder::jose::Jwk;
use verified_id_wallet::holder::key_store::InMemoryKeyStore;
use verified_id_wallet::holder::{IdentifierFactory, TokenSigner};

/// A signing-capable wallet fixture: one in-memory key per identifier.
pub struct TestWallet {
    pub signer: TokenSigner,
    pub identifiers: IdentifierFactory,
    /// Public keys by DID, for verifying what the wallet signs.
    pub public_keys: HashMap<String, Jwk>,
}

pub fn wallet(dids: &[&str]) -> TestWallet {
    let mut store = InMemoryKeyStore::new();
    let mut identifiers = Vec::new();
    let mut public_keys = HashMap::new();

    for (i, did) in dids.iter().enumerate() {
        let reference = format!("key-{i}");
        public_keys.insert(did.to_string(), store.generate(&reference));
        identifiers.push(HolderIdentifier::new(*did, reference, "ES256", true));
    }

    TestWallet {
        signer: TokenSigner::new(Arc::new(store)),
        identifiers: IdentifierFactory::new(identifiers),
        public_keys,
    }
}

/// An unsigned-but-well-formed compact credential token. The store model
/// decodes payloads without verifying signatures, so a placeholder third
/// segment is enough for flow tests.
pub fn raw_credential(
    credential_type: &str,
    issuer: &str,
    subject: &str,
    subject_claims: serde_json::Value,
) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256","typ":"JWT"}"#);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&json!({
            "jti": format!("urn:uuid:{credential_type}"),
            "iss": issuer,
            "sub": subject,
            "iat": 1700000000,
            "vc": {
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "type": ["VerifiableCredential", credential_type],
                "credentialSubject": subject_claims
            }
        }))
        .unwrap(),
    );
    format!("{header}.{payload}.placeholder")
}

pub fn verified_id(credential_type: &str, issuer: &str, subject: &str) -> VerifiedId {
    VerifiedId::VerifiableCredential(
        VerifiableCredential::from_raw_token(
            raw_credential(credential_type, issuer, subject, json!({ "name": "Jane Roe" })),
            Default::default(),
            HashMap::new(),
        )
        .unwrap(),
    )
}
