//! OpenID for Verifiable Credential Issuance wire shapes.
//!
//! The subset of OID4VCI the holder consumes and produces: credential
//! offers, issuer metadata, the pre-authorized token request, and the JWT
//! proof posted to the credential endpoint. Field names are
//! protocol-mandated.
//!
//! See: <https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html>

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A credential offer as fetched from an issuer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialOffer {
    /// Base URL of the credential issuer.
    pub credential_issuer: String,
    /// Keys into the issuer metadata's `credential_configurations_supported`
    /// map naming the credentials being offered.
    pub credential_configuration_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grants: Option<Grants>,
}

/// Grants offered alongside a credential offer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grants {
    #[serde(
        rename = "urn:ietf:params:oauth:grant-type:pre-authorized_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub pre_authorized_code: Option<PreAuthorizedCodeGrant>,
}

/// The pre-authorized code grant of an offer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreAuthorizedCodeGrant {
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,
    /// Present when the token endpoint requires a transaction code (PIN).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<TxCode>,
}

/// Shape of the transaction code the holder must enter.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxCode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// `numeric` or `text`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Credential issuer metadata, fetched from
/// `/.well-known/openid-credential-issuer`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialIssuerMetadata {
    pub credential_issuer: String,
    /// Endpoint credential requests (with proofs) are posted to; also the
    /// audience of the issuance proof JWT.
    pub credential_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce_endpoint: Option<String>,
    #[serde(default)]
    pub credential_configurations_supported: HashMap<String, CredentialConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<IssuerDisplay>,
}

impl CredentialIssuerMetadata {
    /// The issuer's preferred display name, falling back to its base URL.
    pub fn issuer_name(&self) -> &str {
        self.display
            .iter()
            .find_map(|d| d.name.as_deref())
            .unwrap_or(&self.credential_issuer)
    }

    /// The token endpoint, defaulting to `{credential_issuer}/token` when
    /// the metadata does not declare one.
    pub fn token_endpoint(&self) -> String {
        self.token_endpoint.clone().unwrap_or_else(|| {
            format!(
                "{}/token",
                self.credential_issuer.trim_end_matches('/')
            )
        })
    }
}

/// Issuer-level display metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuerDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// One supported credential configuration of an issuer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialConfiguration {
    /// Credential format identifier, e.g. `jwt_vc_json`.
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_definition: Option<CredentialDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<CredentialDisplay>,
}

impl CredentialConfiguration {
    /// Credential types declared by the configuration.
    pub fn credential_types(&self) -> &[String] {
        self.credential_definition
            .as_ref()
            .map(|d| d.types.as_slice())
            .unwrap_or_default()
    }
}

/// The `credential_definition` of a W3C-format configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialDefinition {
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    /// Per-claim metadata keyed by credential subject claim name.
    #[serde(
        rename = "credentialSubject",
        default,
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub credential_subject: HashMap<String, ClaimMetadata>,
}

/// Metadata an issuer declares for one credential subject claim.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<ClaimDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<bool>,
}

impl ClaimMetadata {
    /// The issuer's preferred display name for the claim, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.display.iter().find_map(|d| d.name.as_deref())
    }
}

/// One localized display entry of a claim.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Per-credential display metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Token request for the pre-authorized code flow, form-posted to the token
/// endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreAuthorizedTokenRequest {
    /// Always `urn:ietf:params:oauth:grant-type:pre-authorized_code`.
    pub grant_type: String,
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<String>,
}

impl PreAuthorizedTokenRequest {
    pub fn new(pre_authorized_code: impl Into<String>, tx_code: Option<String>) -> Self {
        Self {
            grant_type: "urn:ietf:params:oauth:grant-type:pre-authorized_code".into(),
            pre_authorized_code: pre_authorized_code.into(),
            tx_code,
        }
    }
}

/// Token endpoint response for the pre-authorized code flow.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Nonce to bind the issuance proof to, when the issuer supplies one at
    /// the token endpoint rather than a dedicated nonce endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
}

/// The proof object of a credential request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proof {
    /// Always `jwt`.
    pub proof_type: String,
    pub jwt: String,
}

impl Proof {
    pub fn jwt(jwt: impl Into<String>) -> Self {
        Self {
            proof_type: "jwt".into(),
            jwt: jwt.into(),
        }
    }
}

/// A credential request posted to the credential endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRequest {
    pub credential_configuration_id: String,
    pub proof: Proof,
}

/// The credential endpoint's response.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialResponse {
    /// The issued credential, a signed compact token.
    pub credential: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
}
