//! Issuance response formatting.
//!
//! An issuance response is a self-issued ID token carrying the fulfilled
//! attestations of a contract's requirement tree, signed by the holder
//! identifier the credential will be bound to.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::Serialize;
use url::Url;

use crate::core::manifest::IssuanceContract;
use crate::core::requirement::Requirement;
use crate::holder::identifier::HolderIdentifier;
use crate::holder::jose::{Jwk, JwsType};
use crate::holder::signer::TokenSigner;
use crate::response::{FormatterError, SELF_ISSUED};

/// The fulfilled attestation buckets of a requirement tree, collected into
/// the maps the issuance response wire format expects.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct AttestationClaims {
    /// Holder-entered claim values keyed by claim name.
    #[serde(rename = "selfIssued", skip_serializing_if = "HashMap::is_empty")]
    pub self_issued: HashMap<String, String>,
    /// Acquired id tokens keyed by their OIDC configuration endpoint.
    #[serde(rename = "idTokens", skip_serializing_if = "HashMap::is_empty")]
    pub id_tokens: HashMap<String, String>,
    /// Acquired access tokens keyed by their configuration endpoint.
    #[serde(rename = "accessTokens", skip_serializing_if = "HashMap::is_empty")]
    pub access_tokens: HashMap<String, String>,
    /// Verifiable Presentations keyed by the presented credential type.
    #[serde(rename = "presentations", skip_serializing_if = "HashMap::is_empty")]
    pub presentations: HashMap<String, String>,
}

impl AttestationClaims {
    /// Collect every fulfilled leaf of the tree, recursing through groups.
    ///
    /// Requirement variants that have no place in an issuance response are
    /// logged and dropped rather than failing the build.
    pub fn collect(requirement: &Requirement) -> Self {
        let mut claims = Self::default();
        claims.visit(requirement);
        claims
    }

    fn visit(&mut self, requirement: &Requirement) {
        match requirement {
            Requirement::SelfAttestedClaim(r) => {
                self.self_issued.extend(
                    r.values()
                        .iter()
                        .map(|(claim, value)| (claim.clone(), value.clone())),
                );
            }
            Requirement::IdToken(r) => {
                if let Some(token) = r.id_token() {
                    self.id_tokens
                        .insert(r.configuration.to_string(), token.to_string());
                }
            }
            Requirement::AccessToken(r) => {
                if let Some(token) = r.access_token() {
                    self.access_tokens
                        .insert(r.configuration.to_string(), token.to_string());
                }
            }
            Requirement::Group(group) => {
                for child in &group.requirements {
                    self.visit(child);
                }
            }
            // Pins travel as a top-level claim, not as an attestation.
            Requirement::Pin(_) => {}
            other => {
                tracing::warn!(
                    "dropping requirement with no issuance attestation mapping: {other:?}"
                );
            }
        }
    }
}

/// The claim set of a signed issuance response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IssuanceResponseClaims {
    pub iss: String,
    /// The holder DID the issued credential will be bound to.
    pub sub: String,
    /// The contract's credential issuance endpoint.
    pub aud: Url,
    /// Public key of the holder's signing key.
    pub sub_jwk: Jwk,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// The contract this response answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    pub attestations: AttestationClaims,
}

/// Formats and signs issuance responses.
pub struct IssuanceResponseFormatter {
    signer: TokenSigner,
    validity: Duration,
}

impl IssuanceResponseFormatter {
    pub fn new(signer: TokenSigner) -> Self {
        Self {
            signer,
            validity: Duration::minutes(5),
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Validate the requirement tree and sign the issuance response.
    ///
    /// Validation failures surface before any key material is touched.
    pub async fn format(
        &self,
        contract: &IssuanceContract,
        requirement: &Requirement,
        identifier: &HolderIdentifier,
    ) -> Result<String, FormatterError> {
        requirement.validate()?;

        let now = Utc::now();
        let claims = IssuanceResponseClaims {
            iss: SELF_ISSUED.to_string(),
            sub: identifier.did.clone(),
            aud: contract.input.credential_issuer.clone(),
            sub_jwk: self.signer.public_jwk(identifier).await?,
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            contract: contract.id.clone(),
            pin: pin_value(requirement),
            attestations: AttestationClaims::collect(requirement),
        };

        Ok(self
            .signer
            .sign_with_identifier(&claims, identifier, JwsType::Jwt)
            .await?)
    }
}

fn pin_value(requirement: &Requirement) -> Option<String> {
    match requirement {
        Requirement::Pin(pin) => pin.pin().map(str::to_string),
        Requirement::Group(group) => group.requirements.iter().find_map(pin_value),
        _ => None,
    }
}
