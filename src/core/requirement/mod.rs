//! The uniform requirement tree.
//!
//! Every inbound protocol request, whatever its wire shape, resolves to a
//! [Requirement]: a tree describing what the holder must supply before a
//! response can be constructed. The tree is built fresh per request, mutated
//! in place as the holder fulfills it, consumed once by a response formatter
//! and then discarded.
//!
//! Validation is Result-based throughout: an unfulfilled requirement is an
//! expected, recoverable state with its own error variant, distinct from
//! malformed-input errors, so callers can prompt rather than abort.
//! [GroupRequirement::validate] evaluates every child rather than
//! short-circuiting, so a caller can render all outstanding errors at once.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::constraint::{Constraint, ConstraintError};
use crate::core::verified_id::VerifiedId;

/// A requirement that could not be validated or fulfilled.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RequirementError {
    /// One or more self-attested claims have not been provided yet.
    #[error("self attested claims not fulfilled: {}", missing.join(", "))]
    SelfAttestedClaimNotFulfilled {
        /// Names of the required claims still missing a value.
        missing: Vec<String>,
    },

    /// The id token for the named configuration has not been acquired.
    #[error("id token requirement for `{0}` has not been fulfilled")]
    IdTokenNotFulfilled(String),

    /// The access token for the named configuration has not been acquired.
    #[error("access token requirement for `{0}` has not been fulfilled")]
    AccessTokenNotFulfilled(String),

    /// No Verified ID has been assigned to the requirement.
    #[error("verified id requirement `{0}` has not been fulfilled")]
    VerifiedIdNotFulfilled(String),

    /// No PIN has been provided.
    #[error("pin requirement has not been fulfilled")]
    PinNotFulfilled,

    /// The provided PIN does not satisfy the declared length or type.
    #[error("pin does not satisfy declared length {expected_length} or type `{pin_type}`")]
    InvalidPin {
        expected_length: usize,
        pin_type: PinType,
    },

    /// The assigned Verified ID does not satisfy the requirement constraint.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// One or more children of a group are unmet. Every child is evaluated;
    /// `unmet` carries all failures, not just the first.
    #[error("{} of {total} grouped requirements are unmet", unmet.len())]
    Group {
        operator: GroupOperator,
        total: usize,
        unmet: Vec<RequirementError>,
    },
}

/// Combinator for [GroupRequirement] children.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    /// Every child must validate.
    All,
    /// At least one child must validate.
    Any,
}

/// Leaf descriptor of a single claim name/type pair requested from the
/// holder. Immutable once created from a protocol attestation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimRequirement {
    pub claim: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub claim_type: String,
}

impl ClaimRequirement {
    pub fn new(claim: impl Into<String>, required: bool, claim_type: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            required,
            claim_type: claim_type.into(),
        }
    }
}

/// Fulfilled by holder-entered text, one value per requested claim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelfAttestedClaimRequirement {
    pub id: String,
    pub required: bool,
    pub encrypted: bool,
    pub claims: Vec<ClaimRequirement>,
    /// Holder-provided values keyed by claim name; starts empty.
    #[serde(default, skip_serializing_if = "std::collections::HashMap::is_empty")]
    values: std::collections::HashMap<String, String>,
}

impl SelfAttestedClaimRequirement {
    pub fn new(
        id: impl Into<String>,
        required: bool,
        encrypted: bool,
        claims: Vec<ClaimRequirement>,
    ) -> Self {
        Self {
            id: id.into(),
            required,
            encrypted,
            claims,
            values: Default::default(),
        }
    }

    /// Record the holder-entered value for one of the requested claims.
    /// Values for claim names the request did not ask for are ignored.
    pub fn fulfill(&mut self, claim: impl AsRef<str>, value: impl Into<String>) {
        let claim = claim.as_ref();
        if self.claims.iter().any(|c| c.claim == claim) {
            self.values.insert(claim.to_string(), value.into());
        } else {
            tracing::warn!("ignoring value for unrequested self-attested claim `{claim}`");
        }
    }

    /// Holder-provided values keyed by claim name.
    pub fn values(&self) -> &std::collections::HashMap<String, String> {
        &self.values
    }

    pub fn is_fulfilled(&self) -> bool {
        self.missing_claims().is_empty()
    }

    pub fn validate(&self) -> Result<(), RequirementError> {
        let missing = self.missing_claims();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RequirementError::SelfAttestedClaimNotFulfilled { missing })
        }
    }

    fn missing_claims(&self) -> Vec<String> {
        self.claims
            .iter()
            .filter(|c| c.required && !self.values.contains_key(&c.claim))
            .map(|c| c.claim.clone())
            .collect()
    }
}

/// Fulfilled by an id token acquired from the named OIDC configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdTokenRequirement {
    pub id: String,
    pub required: bool,
    pub encrypted: bool,
    /// The OIDC configuration endpoint the token must come from.
    pub configuration: Url,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub claims: Vec<ClaimRequirement>,
    /// Nonce the token must be bound to, if the request supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
}

impl IdTokenRequirement {
    pub fn new(
        id: impl Into<String>,
        required: bool,
        encrypted: bool,
        configuration: Url,
        client_id: Option<String>,
        redirect_uri: Option<String>,
        scope: Option<String>,
        claims: Vec<ClaimRequirement>,
    ) -> Self {
        Self {
            id: id.into(),
            required,
            encrypted,
            configuration,
            client_id,
            redirect_uri,
            scope,
            claims,
            nonce: None,
            id_token: None,
        }
    }

    pub fn fulfill(&mut self, id_token: impl Into<String>) {
        self.id_token = Some(id_token.into());
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.id_token.is_some()
    }

    pub fn validate(&self) -> Result<(), RequirementError> {
        if self.id_token.is_some() {
            Ok(())
        } else {
            Err(RequirementError::IdTokenNotFulfilled(
                self.configuration.to_string(),
            ))
        }
    }
}

/// Fulfilled by an access token acquired from the named configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenRequirement {
    pub id: String,
    pub required: bool,
    pub encrypted: bool,
    pub configuration: Url,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub resource_id: Option<String>,
    pub scope: Option<String>,
    pub claims: Vec<ClaimRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

impl AccessTokenRequirement {
    pub fn new(
        id: impl Into<String>,
        required: bool,
        encrypted: bool,
        configuration: Url,
        resource_id: Option<String>,
        scope: Option<String>,
        claims: Vec<ClaimRequirement>,
    ) -> Self {
        Self {
            id: id.into(),
            required,
            encrypted,
            configuration,
            client_id: None,
            redirect_uri: None,
            resource_id,
            scope,
            claims,
            access_token: None,
        }
    }

    pub fn fulfill(&mut self, access_token: impl Into<String>) {
        self.access_token = Some(access_token.into());
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn validate(&self) -> Result<(), RequirementError> {
        if self.access_token.is_some() {
            Ok(())
        } else {
            Err(RequirementError::AccessTokenNotFulfilled(
                self.configuration.to_string(),
            ))
        }
    }
}

/// Fulfilled by assigning a stored Verified ID that satisfies the
/// requirement's constraint and accepted-issuer list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerifiedIdRequirement {
    pub id: String,
    /// Credential types the requester will accept.
    pub types: Vec<String>,
    /// Issuer DIDs the requester will accept; empty means any issuer.
    pub accepted_issuers: Vec<String>,
    pub required: bool,
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Contract URLs where a matching credential can be obtained if the
    /// holder does not hold one yet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuance_options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verified_id: Option<VerifiedId>,
}

impl VerifiedIdRequirement {
    pub fn new(
        id: impl Into<String>,
        types: Vec<String>,
        accepted_issuers: Vec<String>,
        required: bool,
        encrypted: bool,
        purpose: Option<String>,
        issuance_options: Vec<String>,
        constraint: Option<Constraint>,
    ) -> Self {
        Self {
            id: id.into(),
            types,
            accepted_issuers,
            required,
            encrypted,
            purpose,
            issuance_options,
            constraint,
            verified_id: None,
        }
    }

    /// Assign a Verified ID after asserting that it satisfies the
    /// requirement.
    pub fn fulfill(&mut self, verified_id: VerifiedId) -> Result<(), RequirementError> {
        self.assert_match(&verified_id)?;
        self.verified_id = Some(verified_id);
        Ok(())
    }

    /// Pure check: would `verified_id` satisfy this requirement?
    pub fn does_match(&self, verified_id: &VerifiedId) -> bool {
        self.assert_match(verified_id).is_ok()
    }

    fn assert_match(&self, verified_id: &VerifiedId) -> Result<(), RequirementError> {
        if !self.accepted_issuers.is_empty()
            && !self
                .accepted_issuers
                .iter()
                .any(|iss| iss == verified_id.issuer())
        {
            return Err(ConstraintError::IssuerNotRequested(
                verified_id.issuer().to_string(),
            )
            .into());
        }

        if let Some(constraint) = &self.constraint {
            constraint.matches(verified_id)?;
        }
        Ok(())
    }

    pub fn verified_id(&self) -> Option<&VerifiedId> {
        self.verified_id.as_ref()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.verified_id.is_some()
    }

    pub fn validate(&self) -> Result<(), RequirementError> {
        match &self.verified_id {
            Some(verified_id) => self.assert_match(verified_id),
            None => Err(RequirementError::VerifiedIdNotFulfilled(self.id.clone())),
        }
    }
}

/// A [VerifiedIdRequirement] sourced from a Presentation Exchange input
/// descriptor, extended with the submission bookkeeping the response
/// formatter needs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PresentationExchangeVerifiedIdRequirement {
    /// The underlying Verified ID requirement.
    pub requirement: VerifiedIdRequirement,
    /// Id of the input descriptor this requirement was mapped from; echoed
    /// back in the presentation submission descriptor map.
    pub input_descriptor_id: String,
    /// Claim format the credential is presented in, e.g. `jwt_vc`.
    pub format: String,
    /// Input descriptor ids whose credentials must not share a Verifiable
    /// Presentation with this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusive_presentation_with: Vec<String>,
}

/// User-PIN shape declared by the request.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    #[default]
    Numeric,
    Alphanumeric,
}

impl std::fmt::Display for PinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Alphanumeric => write!(f, "alphanumeric"),
        }
    }
}

/// Fulfilled with a user-entered PIN matching the declared length and type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinRequirement {
    pub length: usize,
    #[serde(rename = "type")]
    pub pin_type: PinType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pin: Option<String>,
}

impl PinRequirement {
    pub fn new(length: usize, pin_type: PinType, required: bool) -> Self {
        Self {
            length,
            pin_type,
            required,
            pin: None,
        }
    }

    pub fn fulfill(&mut self, pin: impl Into<String>) {
        self.pin = Some(pin.into());
    }

    pub fn pin(&self) -> Option<&str> {
        self.pin.as_deref()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.pin.is_some()
    }

    pub fn validate(&self) -> Result<(), RequirementError> {
        let Some(pin) = &self.pin else {
            return Err(RequirementError::PinNotFulfilled);
        };

        let well_formed = pin.chars().count() == self.length
            && match self.pin_type {
                PinType::Numeric => pin.chars().all(|c| c.is_ascii_digit()),
                PinType::Alphanumeric => pin.chars().all(|c| c.is_ascii_alphanumeric()),
            };

        if well_formed {
            Ok(())
        } else {
            Err(RequirementError::InvalidPin {
                expected_length: self.length,
                pin_type: self.pin_type,
            })
        }
    }
}

/// Composite of nested requirements under an ALL or ANY operator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GroupRequirement {
    pub required: bool,
    pub requirements: Vec<Requirement>,
    pub operator: GroupOperator,
}

impl GroupRequirement {
    pub fn new(required: bool, requirements: Vec<Requirement>, operator: GroupOperator) -> Self {
        Self {
            required,
            requirements,
            operator,
        }
    }

    /// Validate every child, then apply the operator.
    ///
    /// All children are evaluated even once the outcome is decided, so the
    /// caller can surface every outstanding requirement at once.
    pub fn validate(&self) -> Result<(), RequirementError> {
        let unmet: Vec<RequirementError> = self
            .requirements
            .iter()
            .filter_map(|r| r.validate().err())
            .collect();

        let satisfied = match self.operator {
            GroupOperator::All => unmet.is_empty(),
            GroupOperator::Any => unmet.len() < self.requirements.len(),
        };

        if satisfied {
            Ok(())
        } else {
            Err(RequirementError::Group {
                operator: self.operator,
                total: self.requirements.len(),
                unmet,
            })
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        match self.operator {
            GroupOperator::All => self.requirements.iter().all(Requirement::is_fulfilled),
            GroupOperator::Any => self.requirements.iter().any(Requirement::is_fulfilled),
        }
    }
}

/// The uniform requirement tree a raw protocol request resolves to.
///
/// Strictly a tree, never a graph: built fresh per inbound request and owned
/// by exactly one in-flight operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Requirement {
    /// Leaf claim descriptor; carries no fulfillment state of its own.
    Claim(ClaimRequirement),
    SelfAttestedClaim(SelfAttestedClaimRequirement),
    IdToken(IdTokenRequirement),
    AccessToken(AccessTokenRequirement),
    VerifiedId(VerifiedIdRequirement),
    PresentationExchange(PresentationExchangeVerifiedIdRequirement),
    Pin(PinRequirement),
    Group(GroupRequirement),
}

impl Requirement {
    pub fn required(&self) -> bool {
        match self {
            Self::Claim(r) => r.required,
            Self::SelfAttestedClaim(r) => r.required,
            Self::IdToken(r) => r.required,
            Self::AccessToken(r) => r.required,
            Self::VerifiedId(r) => r.required,
            Self::PresentationExchange(r) => r.requirement.required,
            Self::Pin(r) => r.required,
            Self::Group(r) => r.required,
        }
    }

    /// Check fulfillment and structural constraints, producing success or a
    /// typed failure. Pure; never panics for expected unfulfilled states.
    pub fn validate(&self) -> Result<(), RequirementError> {
        match self {
            Self::Claim(_) => Ok(()),
            Self::SelfAttestedClaim(r) => r.validate(),
            Self::IdToken(r) => r.validate(),
            Self::AccessToken(r) => r.validate(),
            Self::VerifiedId(r) => r.validate(),
            Self::PresentationExchange(r) => r.requirement.validate(),
            Self::Pin(r) => r.validate(),
            Self::Group(r) => r.validate(),
        }
    }

    /// Pure read with no side effects: has the holder supplied a value yet?
    pub fn is_fulfilled(&self) -> bool {
        match self {
            Self::Claim(_) => true,
            Self::SelfAttestedClaim(r) => r.is_fulfilled(),
            Self::IdToken(r) => r.is_fulfilled(),
            Self::AccessToken(r) => r.is_fulfilled(),
            Self::VerifiedId(r) => r.is_fulfilled(),
            Self::PresentationExchange(r) => r.requirement.is_fulfilled(),
            Self::Pin(r) => r.is_fulfilled(),
            Self::Group(r) => r.is_fulfilled(),
        }
    }

    /// Collect the requirements still awaiting input, depth-first.
    ///
    /// A fulfilled subtree contributes nothing, so a satisfied ANY group
    /// hides its remaining alternatives. The returned leaves are what a
    /// caller would prompt the holder for next.
    pub fn unfulfilled(&self) -> Vec<&Requirement> {
        if self.is_fulfilled() {
            return Vec::new();
        }
        match self {
            Self::Group(group) => group
                .requirements
                .iter()
                .flat_map(Requirement::unfulfilled)
                .collect(),
            _ => vec![self],
        }
    }
}
