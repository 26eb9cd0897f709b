//! Mapping issuance contracts into the requirement tree.

use crate::core::constraint::{Constraint, VcTypeConstraint};
use crate::core::manifest::{
    AccessTokenAttestation, ClaimAttestation, IdTokenAttestation, IssuanceContract,
    PresentationAttestation, SelfIssuedAttestation,
};
use crate::core::requirement::{
    AccessTokenRequirement, ClaimRequirement, GroupOperator, IdTokenRequirement, Requirement,
    SelfAttestedClaimRequirement, VerifiedIdRequirement,
};
use crate::core::styles::{RequesterStyle, VerifiedIdLogo, VerifiedIdStyle};
use crate::mapper::{collapse, MappingError};

/// Map a contract's attestation buckets into a requirement tree.
///
/// Each non-empty bucket contributes its requirements; multiple buckets
/// collapse into an ALL group, a single bucket is returned unwrapped, and a
/// contract with every bucket empty is rejected.
pub fn requirements(contract: &IssuanceContract) -> Result<Requirement, MappingError> {
    let attestations = &contract.input.attestations;
    let mut mapped = Vec::new();

    if let Some(self_issued) = &attestations.self_issued {
        mapped.push(self_attested_requirement(self_issued));
    }
    for attestation in &attestations.id_tokens {
        mapped.push(id_token_requirement(attestation));
    }
    for attestation in &attestations.access_tokens {
        mapped.push(access_token_requirement(attestation));
    }
    for attestation in &attestations.presentations {
        mapped.push(presentation_requirement(attestation));
    }

    collapse(mapped, GroupOperator::All).ok_or(MappingError::UnsupportedRequirementType)
}

/// Extract the requester style shown while the holder decides whether to
/// respond to the contract.
pub fn requester_style(contract: &IssuanceContract) -> RequesterStyle {
    let card = &contract.display.card;
    RequesterStyle {
        name: card
            .issued_by
            .clone()
            .unwrap_or_else(|| contract.input.issuer.clone()),
        logo: card.logo.as_ref().map(|logo| VerifiedIdLogo {
            uri: logo.uri.clone(),
            image: logo.image.clone(),
            alt_text: logo.description.clone(),
        }),
    }
}

/// Extract the style the issued Verified ID will be rendered with.
pub fn verified_id_style(contract: &IssuanceContract) -> VerifiedIdStyle {
    let card = &contract.display.card;
    VerifiedIdStyle {
        name: card.title.clone(),
        issuer: card.issued_by.clone(),
        background_color: card.background_color.clone(),
        text_color: card.text_color.clone(),
        description: card.description.clone(),
        logo: card.logo.as_ref().map(|logo| VerifiedIdLogo {
            uri: logo.uri.clone(),
            image: logo.image.clone(),
            alt_text: logo.description.clone(),
        }),
    }
}

fn claim_requirements(claims: &[ClaimAttestation]) -> Vec<ClaimRequirement> {
    claims
        .iter()
        .map(|c| ClaimRequirement::new(&c.claim, c.required, &c.claim_type))
        .collect()
}

fn self_attested_requirement(attestation: &SelfIssuedAttestation) -> Requirement {
    Requirement::SelfAttestedClaim(SelfAttestedClaimRequirement::new(
        "attestations/selfIssued",
        attestation.required,
        attestation.encrypted,
        claim_requirements(&attestation.claims),
    ))
}

fn id_token_requirement(attestation: &IdTokenAttestation) -> Requirement {
    Requirement::IdToken(IdTokenRequirement::new(
        attestation.configuration.as_str(),
        attestation.required,
        attestation.encrypted,
        attestation.configuration.clone(),
        attestation.client_id.clone(),
        attestation.redirect_uri.clone(),
        attestation.scope.clone(),
        claim_requirements(&attestation.claims),
    ))
}

fn access_token_requirement(attestation: &AccessTokenAttestation) -> Requirement {
    Requirement::AccessToken(AccessTokenRequirement::new(
        attestation.configuration.as_str(),
        attestation.required,
        attestation.encrypted,
        attestation.configuration.clone(),
        attestation.resource_id.clone(),
        attestation.scope.clone(),
        claim_requirements(&attestation.claims),
    ))
}

fn presentation_requirement(attestation: &PresentationAttestation) -> Requirement {
    Requirement::VerifiedId(VerifiedIdRequirement::new(
        &attestation.credential_type,
        vec![attestation.credential_type.clone()],
        attestation.accepted_issuers.clone(),
        attestation.required,
        attestation.encrypted,
        None,
        attestation.contracts.clone(),
        Some(Constraint::VcType(VcTypeConstraint {
            vc_type: attestation.credential_type.clone(),
        })),
    ))
}
