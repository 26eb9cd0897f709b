//! Manifest (issuance contract) wire shapes.
//!
//! An issuance contract describes the attestations an issuer requires before
//! it will issue a credential, together with a display contract describing
//! how the issued credential should be rendered. Mapping these shapes into
//! the requirement tree lives in [crate::mapper::manifest].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::styles::ClaimDisplayDescriptor;

/// A full issuance contract as fetched from an issuer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuanceContract {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub display: DisplayContract,
    pub input: ContractInput,
}

/// The input section: where to send the response and what it must contain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractInput {
    /// Endpoint the signed issuance response is posted to.
    pub credential_issuer: Url,
    /// Issuer DID.
    pub issuer: String,
    #[serde(default)]
    pub attestations: Attestations,
}

/// The requirement buckets of a contract. Any combination may be present;
/// a contract with every bucket empty is malformed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attestations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_issued: Option<SelfIssuedAttestation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_tokens: Vec<IdTokenAttestation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_tokens: Vec<AccessTokenAttestation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presentations: Vec<PresentationAttestation>,
}

/// One claim requested inside an attestation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimAttestation {
    pub claim: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default)]
    pub claim_type: String,
}

/// Claims the holder attests to directly.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelfIssuedAttestation {
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub required: bool,
    pub claims: Vec<ClaimAttestation>,
}

/// An id token the holder must acquire from a named OIDC configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdTokenAttestation {
    pub configuration: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<ClaimAttestation>,
}

/// An access token the holder must acquire for a named resource.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenAttestation {
    pub configuration: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<ClaimAttestation>,
}

/// An existing Verified ID the holder must present to the issuer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationAttestation {
    pub credential_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_issuers: Vec<String>,
    /// Contract URLs where a matching credential can be obtained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<String>,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub required: bool,
}

/// The display section of a contract.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayContract {
    #[serde(default)]
    pub card: CardDisplay,
    #[serde(default)]
    pub consent: ConsentDisplay,
    /// Display descriptors keyed by a synthetic claim path such as
    /// `vc.credentialSubject.name`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub claims: HashMap<String, ClaimDisplayDescriptor>,
}

/// How the issued credential card should be rendered.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDisplay {
    #[serde(default)]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<LogoDisplay>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogoDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Consent text shown while the holder decides whether to respond.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentDisplay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub instructions: String,
}
