//! Token signing against the key store.

use std::sync::Arc;

use crate::holder::identifier::{HolderIdentifier, IdentifierError};
use crate::holder::jose::{JoseError, Jwk, JwsHeader, JwsToken, JwsType};
use crate::holder::key_store::{KeyStore, KeyStoreError};

/// Signing failure.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Jose(#[from] JoseError),
}

/// Signs claim sets as compact JWS tokens on behalf of a holder identifier.
///
/// The signer resolves keys by reference at signing time; it holds no key
/// material of its own.
#[derive(Clone)]
pub struct TokenSigner {
    key_store: Arc<dyn KeyStore>,
}

impl TokenSigner {
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self { key_store }
    }

    /// Sign `claims` with the identifier's key. The protected header carries
    /// the identifier's algorithm, its verification-method id as `kid`, and
    /// the given `typ`.
    pub async fn sign_with_identifier<T: serde::Serialize>(
        &self,
        claims: &T,
        identifier: &HolderIdentifier,
        typ: JwsType,
    ) -> Result<String, SigningError> {
        let key = self
            .key_store
            .key(&identifier.signature_key_reference)
            .await?;

        let header = JwsHeader {
            alg: identifier.algorithm.clone(),
            kid: Some(identifier.key_id()),
            typ: Some(typ.to_string()),
        };

        tracing::debug!(kid = %identifier.key_id(), %typ, "signing token");
        Ok(JwsToken::sign(claims, &header, &key)?.compact())
    }

    /// The identifier's public key, for `sub_jwk` style claims.
    pub async fn public_jwk(&self, identifier: &HolderIdentifier) -> Result<Jwk, SigningError> {
        let key = self
            .key_store
            .key(&identifier.signature_key_reference)
            .await?;
        Ok(key.public())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::holder::key_store::InMemoryKeyStore;
    use serde_json::json;

    fn signer_with_key(reference: &str) -> (TokenSigner, Jwk) {
        let mut store = InMemoryKeyStore::new();
        let public = store.generate(reference);
        (TokenSigner::new(Arc::new(store)), public)
    }

    #[tokio::test]
    async fn signed_token_carries_kid_and_typ() {
        let (signer, public) = signer_with_key("key-1");
        let identifier = HolderIdentifier::new("did:example:holder", "key-1", "ES256", true);

        let compact = signer
            .sign_with_identifier(
                &json!({ "sub": "did:example:holder" }),
                &identifier,
                JwsType::OpenId4VciProofJwt,
            )
            .await
            .unwrap();

        let token = JwsToken::parse(&compact).unwrap();
        token.verify(&public).unwrap();

        let header = token.header().unwrap();
        assert_eq!(header.alg, "ES256");
        assert_eq!(header.kid.as_deref(), Some("did:example:holder#key-1"));
        assert_eq!(header.typ.as_deref(), Some("openid4vci-proof+jwt"));
    }

    #[tokio::test]
    async fn missing_key_surfaces_key_store_error() {
        let (signer, _) = signer_with_key("key-1");
        let identifier = HolderIdentifier::new("did:example:holder", "other", "ES256", true);

        let result = signer
            .sign_with_identifier(&json!({}), &identifier, JwsType::Jwt)
            .await;
        assert!(matches!(
            result,
            Err(SigningError::KeyStore(KeyStoreError::KeyNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn public_jwk_has_no_private_material() {
        let (signer, public) = signer_with_key("key-1");
        let identifier = HolderIdentifier::new("did:example:holder", "key-1", "ES256", true);

        let jwk = signer.public_jwk(&identifier).await.unwrap();
        assert_eq!(jwk, public);
        assert!(jwk.d.is_none());
    }
}
