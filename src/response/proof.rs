//! OpenID4VCI proof-of-possession formatting.
//!
//! A credential request carries a JWT proof binding the request to the
//! holder's key and to the access token the request rides on. The proof's
//! `typ` header is `openid4vci-proof+jwt`, distinct from the wallet's other
//! JWTs.
//!
//! See: <https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html#name-proof-types>

use base64::prelude::*;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::holder::identifier::HolderIdentifier;
use crate::holder::jose::JwsType;
use crate::holder::signer::TokenSigner;
use crate::response::FormatterError;

/// The claim set of a JWT proof.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProofClaims {
    /// The holder DID the credential will be bound to.
    pub sub: String,
    /// The issuer's credential endpoint.
    pub aud: String,
    pub iat: i64,
    /// base64url SHA-256 hash of the access token the request rides on.
    pub at_hash: String,
    /// The `c_nonce` from the token response, when the issuer supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Formats and signs OpenID4VCI JWT proofs.
pub struct ProofFormatter {
    signer: TokenSigner,
}

impl ProofFormatter {
    pub fn new(signer: TokenSigner) -> Self {
        Self { signer }
    }

    /// Build and sign a proof over the access token, bound to the given
    /// credential endpoint.
    ///
    /// Inputs are validated before any key material is touched: an empty
    /// access token or audience never reaches the signer.
    pub async fn format(
        &self,
        access_token: &str,
        credential_endpoint: &str,
        c_nonce: Option<&str>,
        identifier: &HolderIdentifier,
    ) -> Result<String, FormatterError> {
        if access_token.is_empty() {
            return Err(FormatterError::InvalidProofInput(
                "access token is empty".into(),
            ));
        }
        if credential_endpoint.is_empty() {
            return Err(FormatterError::InvalidProofInput(
                "credential endpoint is empty".into(),
            ));
        }

        let claims = ProofClaims {
            sub: identifier.did.clone(),
            aud: credential_endpoint.to_string(),
            iat: Utc::now().timestamp(),
            at_hash: access_token_hash(access_token),
            nonce: c_nonce.map(str::to_string),
        };

        Ok(self
            .signer
            .sign_with_identifier(&claims, identifier, JwsType::OpenId4VciProofJwt)
            .await?)
    }
}

/// base64url SHA-256 digest of the access token.
fn access_token_hash(access_token: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(access_token.as_bytes()))
}
