//! The Verified ID store model.
//!
//! A [VerifiedId] is a signed, claims-bearing credential held by the holder.
//! The core constructs, matches and serializes Verified IDs; persistence of
//! the encoded bytes is an external collaborator's concern. Serialization
//! round-trips through a discriminated envelope so stored bytes can be
//! decoded back to the correct variant without external type hints.

use std::collections::HashMap;

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::core::openid4vci::{ClaimMetadata, CredentialConfiguration};
use crate::core::styles::{ClaimDisplayDescriptor, VerifiedIdStyle};
use crate::utils::to_human_readable_string;

/// Errors raised while constructing or decoding a Verified ID.
#[derive(Debug, thiserror::Error)]
pub enum VerifiedIdError {
    /// The raw credential token is not a three-segment compact JWS.
    #[error("malformed credential token")]
    MalformedToken,

    /// The credential payload could not be decoded.
    #[error("unable to decode credential payload: {0}")]
    Decoding(String),

    /// The encoded envelope could not be decoded back into a Verified ID.
    #[error("unable to decode verified id envelope: {0}")]
    Envelope(String),
}

/// The decoded claim set of a signed Verifiable Credential token.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CredentialContent {
    /// Credential identifier, `jti` in the signed token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issuer DID.
    pub iss: String,
    /// Subject (holder) DID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// The W3C credential body.
    pub vc: VcDescriptor,
}

/// The `vc` claim of a JWT-secured W3C Verifiable Credential.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct VcDescriptor {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(rename = "credentialSubject", default)]
    pub credential_subject: serde_json::Map<String, Json>,
}

/// A single display-projected claim of a Verified ID.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerifiedIdClaim {
    /// Raw claim name as it appears in the credential subject.
    pub name: String,
    /// Claim value.
    pub value: Json,
    /// Issuer-supplied label, or a humanized form of the raw name when no
    /// display descriptor exists for the claim.
    pub label: String,
    /// Issuer-supplied value type, if a display descriptor exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_type: Option<String>,
}

/// A Verified ID issued through the manifest (contract) flow.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerifiableCredential {
    pub id: String,
    pub types: Vec<String>,
    pub issued_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<DateTime<Utc>>,
    pub style: VerifiedIdStyle,
    /// The raw signed VC token, presented as-is inside Verifiable
    /// Presentations.
    pub raw: String,
    pub content: CredentialContent,
    /// Display descriptors keyed by `vc.credentialSubject.<name>`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub claim_descriptors: HashMap<String, ClaimDisplayDescriptor>,
}

/// A Verified ID issued through the OpenID4VCI flow.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OpenId4VciVerifiedId {
    pub id: String,
    pub types: Vec<String>,
    pub issued_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<DateTime<Utc>>,
    pub style: VerifiedIdStyle,
    pub raw: String,
    pub content: CredentialContent,
    /// Display name of the issuing party, from issuer metadata.
    pub issuer_name: String,
    /// The credential configuration the credential was issued under.
    pub configuration: CredentialConfiguration,
}

/// A credential held by the holder, in one of the supported issuance shapes.
///
/// The `type` tag is the persistence discriminator: encoding a Verified ID
/// and decoding the bytes later yields the same variant with an identical
/// `id`, `types`, `issued_on`, `expires_on` and claim set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VerifiedId {
    VerifiableCredential(VerifiableCredential),
    OpenId4Vci(OpenId4VciVerifiedId),
}

impl VerifiedId {
    pub fn id(&self) -> &str {
        match self {
            Self::VerifiableCredential(vc) => &vc.id,
            Self::OpenId4Vci(vc) => &vc.id,
        }
    }

    pub fn types(&self) -> &[String] {
        match self {
            Self::VerifiableCredential(vc) => &vc.types,
            Self::OpenId4Vci(vc) => &vc.types,
        }
    }

    pub fn issued_on(&self) -> DateTime<Utc> {
        match self {
            Self::VerifiableCredential(vc) => vc.issued_on,
            Self::OpenId4Vci(vc) => vc.issued_on,
        }
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::VerifiableCredential(vc) => vc.expires_on,
            Self::OpenId4Vci(vc) => vc.expires_on,
        }
    }

    pub fn style(&self) -> &VerifiedIdStyle {
        match self {
            Self::VerifiableCredential(vc) => &vc.style,
            Self::OpenId4Vci(vc) => &vc.style,
        }
    }

    /// The raw signed credential token.
    pub fn raw_token(&self) -> &str {
        match self {
            Self::VerifiableCredential(vc) => &vc.raw,
            Self::OpenId4Vci(vc) => &vc.raw,
        }
    }

    /// Issuer DID of the credential.
    pub fn issuer(&self) -> &str {
        match self {
            Self::VerifiableCredential(vc) => &vc.content.iss,
            Self::OpenId4Vci(vc) => &vc.content.iss,
        }
    }

    /// Subject (holder) DID of the credential, if present.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::VerifiableCredential(vc) => vc.content.sub.as_deref(),
            Self::OpenId4Vci(vc) => vc.content.sub.as_deref(),
        }
    }

    fn content(&self) -> &CredentialContent {
        match self {
            Self::VerifiableCredential(vc) => &vc.content,
            Self::OpenId4Vci(vc) => &vc.content,
        }
    }

    /// A JSON projection of the credential claim set, used by the constraint
    /// engine to evaluate path expressions.
    pub fn content_json(&self) -> Json {
        serde_json::to_value(self.content()).unwrap_or(Json::Null)
    }

    /// Project the credential subject into a display-friendly ordered claim
    /// list.
    ///
    /// Manifest-issued credentials are enriched from their display
    /// descriptors, looked up under `vc.credentialSubject.<name>`; OpenID4VCI
    /// credentials from the claim metadata of the configuration they were
    /// issued under. Unmapped claims fall back to a humanized form of their
    /// raw name with no type.
    pub fn claims(&self) -> Vec<VerifiedIdClaim> {
        self.content()
            .vc
            .credential_subject
            .iter()
            .map(|(name, value)| {
                let (label, claim_type) = match self {
                    Self::VerifiableCredential(vc) => {
                        let descriptor = vc
                            .claim_descriptors
                            .get(&format!("vc.credentialSubject.{name}"));
                        (
                            descriptor.map(|d| d.label.clone()),
                            descriptor.and_then(|d| d.claim_type.clone()),
                        )
                    }
                    Self::OpenId4Vci(vc) => {
                        let metadata = vc
                            .configuration
                            .credential_definition
                            .as_ref()
                            .and_then(|definition| definition.credential_subject.get(name));
                        (
                            metadata
                                .and_then(ClaimMetadata::display_name)
                                .map(str::to_string),
                            metadata.and_then(|m| m.value_type.clone()),
                        )
                    }
                };
                VerifiedIdClaim {
                    name: name.clone(),
                    value: value.clone(),
                    label: label.unwrap_or_else(|| to_human_readable_string(name)),
                    claim_type,
                }
            })
            .collect()
    }

    /// Encode the Verified ID into its opaque persistence envelope.
    pub fn encode(&self) -> Result<Vec<u8>, VerifiedIdError> {
        serde_json::to_vec(self).map_err(|e| VerifiedIdError::Envelope(e.to_string()))
    }

    /// Decode a previously encoded Verified ID envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, VerifiedIdError> {
        serde_json::from_slice(bytes).map_err(|e| VerifiedIdError::Envelope(e.to_string()))
    }
}

/// Decode the claim set of a compact JWS credential token without verifying
/// its signature. Signature verification is the issuer trust layer's concern,
/// not the store model's.
pub fn decode_credential_content(raw: &str) -> Result<CredentialContent, VerifiedIdError> {
    let mut segments = raw.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(VerifiedIdError::MalformedToken);
    };

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| VerifiedIdError::Decoding(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| VerifiedIdError::Decoding(e.to_string()))
}

impl VerifiableCredential {
    /// Build a Verified ID from a raw signed VC token and the display
    /// contract it was issued under.
    pub fn from_raw_token(
        raw: impl Into<String>,
        style: VerifiedIdStyle,
        claim_descriptors: HashMap<String, ClaimDisplayDescriptor>,
    ) -> Result<Self, VerifiedIdError> {
        let raw = raw.into();
        let content = decode_credential_content(&raw)?;

        Ok(Self {
            id: content
                .jti
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            types: content.vc.types.clone(),
            issued_on: content
                .iat
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now),
            expires_on: content.exp.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            style,
            raw,
            content,
            claim_descriptors,
        })
    }
}

impl OpenId4VciVerifiedId {
    /// Build a Verified ID from a raw credential returned by an OpenID4VCI
    /// credential endpoint.
    pub fn from_raw_token(
        raw: impl Into<String>,
        issuer_name: impl Into<String>,
        configuration: CredentialConfiguration,
        style: VerifiedIdStyle,
    ) -> Result<Self, VerifiedIdError> {
        let raw = raw.into();
        let content = decode_credential_content(&raw)?;

        Ok(Self {
            id: content
                .jti
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            types: content.vc.types.clone(),
            issued_on: content
                .iat
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now),
            expires_on: content.exp.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            style,
            raw,
            content,
            issuer_name: issuer_name.into(),
            configuration,
        })
    }
}
