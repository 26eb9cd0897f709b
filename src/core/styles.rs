//! Display styles attached to requests and Verified IDs.
//!
//! Requesters (issuers and verifiers) describe how they want to be rendered
//! by the holder application; issuers additionally describe how an issued
//! Verified ID should be rendered. These objects are pure display data and
//! carry no protocol semantics.

use serde::{Deserialize, Serialize};

/// A logo supplied by a requester or issuer.
///
/// Either a resolvable `uri` or an inline base64 `image` may be present;
/// `alt_text` is a textual fallback.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedIdLogo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// How the party making a request wants to be rendered while the holder
/// decides whether to respond.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequesterStyle {
    /// Display name of the requester.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<VerifiedIdLogo>,
}

impl RequesterStyle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logo: None,
        }
    }
}

/// How an issued Verified ID should be rendered by the holder application.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedIdStyle {
    /// Title of the credential card.
    pub name: String,
    /// Display name of the issuing party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<VerifiedIdLogo>,
}

/// An issuer-supplied display descriptor for a single claim.
///
/// Descriptors are keyed by a synthetic path such as
/// `vc.credentialSubject.<name>` in the display contract; a claim with no
/// descriptor falls back to its raw name with no type.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimDisplayDescriptor {
    /// Humanly readable label for the claim.
    pub label: String,
    /// Value type hint, e.g. `String` or `Date`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub claim_type: Option<String>,
}
