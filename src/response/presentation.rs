//! Presentation response formatting.
//!
//! A presentation response answers a Presentation Exchange request with one
//! or more signed Verifiable Presentations plus a self-issued ID token whose
//! `_vp_token` claim array carries the presentation submission tying each
//! presented credential back to its input descriptor.
//!
//! Credentials are grouped into presentations by their subject DID: only the
//! identifier controlling a credential's subject may sign the presentation
//! that wraps it. Descriptors marked mutually exclusive never share a
//! presentation even when their subjects agree.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::core::presentation_submission::{DescriptorMap, PresentationSubmission};
use crate::core::requirement::Requirement;
use crate::holder::identifier::IdentifierFactory;
use crate::holder::jose::{Jwk, JwsType};
use crate::holder::signer::TokenSigner;
use crate::response::{
    FormatterError, RawTokenSerializer, VerifiedIdSerializer, SELF_ISSUED,
};

/// Claim format of the wrapping Verifiable Presentation entries.
const VP_FORMAT: &str = "jwt_vp";

/// The claim set of a signed Verifiable Presentation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VerifiablePresentationClaims {
    pub jti: String,
    /// The presenting subject DID; `iss` and `sub` always agree.
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub nonce: String,
    pub vp: VpDescriptor,
}

/// The `vp` claim body of a JWT-secured Verifiable Presentation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VpDescriptor {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(rename = "verifiableCredential")]
    pub verifiable_credential: Vec<String>,
}

/// The claim set of the self-issued ID token accompanying the presentations.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PresentationResponseClaims {
    pub iss: String,
    /// The wallet's primary identifier DID.
    pub sub: String,
    pub aud: String,
    pub sub_jwk: Jwk,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub nonce: String,
    /// One entry per answered definition; verifiers read this claim as an
    /// array even when a single submission is carried.
    #[serde(rename = "_vp_token")]
    pub vp_token: Vec<VpTokenDescriptor>,
}

/// One `_vp_token` entry: where in the response the presentations live.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VpTokenDescriptor {
    pub presentation_submission: PresentationSubmission,
}

/// A formatted presentation response, ready for submission.
#[derive(Debug, Clone)]
pub struct PresentationResponse {
    /// Self-issued ID token carrying the submission, signed by the primary
    /// identifier.
    pub id_token: String,
    /// Signed Verifiable Presentations, in submission order: entry `i` is
    /// the value the submission's `$[i]` paths point at.
    pub vp_tokens: Vec<String>,
}

/// One presented credential awaiting grouping.
struct PresentationEntry {
    input_descriptor_id: String,
    format: String,
    subject: String,
    token: String,
    exclusive_with: Vec<String>,
}

/// Credentials sharing one Verifiable Presentation.
struct SubmissionGroup {
    subject: String,
    entries: Vec<PresentationEntry>,
    /// Descriptor ids barred from this group by a member's exclusivity list.
    excluded: HashSet<String>,
}

impl SubmissionGroup {
    fn accepts(&self, entry: &PresentationEntry) -> bool {
        self.subject == entry.subject
            && !self.excluded.contains(&entry.input_descriptor_id)
            && !self
                .entries
                .iter()
                .any(|member| entry.exclusive_with.contains(&member.input_descriptor_id))
    }

    fn push(&mut self, entry: PresentationEntry) {
        self.excluded.extend(entry.exclusive_with.iter().cloned());
        self.entries.push(entry);
    }
}

/// Formats and signs presentation responses.
pub struct PresentationResponseFormatter {
    signer: TokenSigner,
    validity: Duration,
}

impl PresentationResponseFormatter {
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

    /// Format the response, presenting each credential's raw signed token.
    pub async fn format(
        &self,
        definition_id: &str,
        audience: &str,
        nonce: &str,
        requirement: &Requirement,
        identifiers: &IdentifierFactory,
    ) -> Result<PresentationResponse, FormatterError> {
        self.format_with_serializer(
            definition_id,
            audience,
            nonce,
            requirement,
            identifiers,
            &RawTokenSerializer,
        )
        .await
    }

    /// Format the response with a custom credential serializer.
    ///
    /// Validation and identifier resolution both precede any signing; a
    /// group whose subject the wallet controls no identifier for aborts the
    /// whole response.
    pub async fn format_with_serializer<S>(
        &self,
        definition_id: &str,
        audience: &str,
        nonce: &str,
        requirement: &Requirement,
        identifiers: &IdentifierFactory,
        serializer: &S,
    ) -> Result<PresentationResponse, FormatterError>
    where
        S: VerifiedIdSerializer<Output = String>,
    {
        requirement.validate()?;

        let master = identifiers.master()?;
        let mut entries = Vec::new();
        collect_entries(requirement, &master.did, serializer, &mut entries)?;

        let groups = group_entries(entries);

        // Resolve every group's signer before signing anything.
        let group_identifiers = groups
            .iter()
            .map(|group| identifiers.identifier_for_did(&group.subject))
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now();
        let mut vp_tokens = Vec::with_capacity(groups.len());
        let mut descriptor_map = Vec::new();

        for (index, (group, identifier)) in groups.iter().zip(&group_identifiers).enumerate() {
            for (member, entry) in group.entries.iter().enumerate() {
                descriptor_map.push(
                    DescriptorMap::new(&entry.input_descriptor_id, VP_FORMAT, format!("$[{index}]"))
                        .with_path_nested(
                            &entry.format,
                            format!("$.verifiableCredential[{member}]"),
                        ),
                );
            }

            let claims = VerifiablePresentationClaims {
                jti: uuid::Uuid::new_v4().to_string(),
                iss: group.subject.clone(),
                sub: group.subject.clone(),
                aud: audience.to_string(),
                iat: now.timestamp(),
                nbf: now.timestamp(),
                exp: (now + self.validity).timestamp(),
                nonce: nonce.to_string(),
                vp: VpDescriptor {
                    context: vec!["https://www.w3.org/2018/credentials/v1".to_string()],
                    types: vec!["VerifiablePresentation".to_string()],
                    verifiable_credential: group
                        .entries
                        .iter()
                        .map(|entry| entry.token.clone())
                        .collect(),
                },
            };

            vp_tokens.push(
                self.signer
                    .sign_with_identifier(&claims, identifier, JwsType::Jwt)
                    .await?,
            );
        }

        let id_claims = PresentationResponseClaims {
            iss: SELF_ISSUED.to_string(),
            sub: master.did.clone(),
            aud: audience.to_string(),
            sub_jwk: self.signer.public_jwk(master).await?,
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            nonce: nonce.to_string(),
            vp_token: vec![VpTokenDescriptor {
                presentation_submission: PresentationSubmission::new(
                    definition_id,
                    descriptor_map,
                ),
            }],
        };

        let id_token = self
            .signer
            .sign_with_identifier(&id_claims, master, JwsType::Jwt)
            .await?;

        Ok(PresentationResponse {
            id_token,
            vp_tokens,
        })
    }
}

/// Walk the tree collecting fulfilled presentation entries. Credentials
/// without a subject DID are presented by the wallet's primary identifier.
fn collect_entries<S>(
    requirement: &Requirement,
    master_did: &str,
    serializer: &S,
    entries: &mut Vec<PresentationEntry>,
) -> Result<(), FormatterError>
where
    S: VerifiedIdSerializer<Output = String>,
{
    match requirement {
        Requirement::PresentationExchange(r) => {
            if let Some(verified_id) = r.requirement.verified_id() {
                entries.push(PresentationEntry {
                    input_descriptor_id: r.input_descriptor_id.clone(),
                    format: r.format.clone(),
                    subject: verified_id
                        .subject()
                        .unwrap_or(master_did)
                        .to_string(),
                    token: serializer.serialize(verified_id)?,
                    exclusive_with: r.exclusive_presentation_with.clone(),
                });
            }
        }
        Requirement::Group(group) => {
            for child in &group.requirements {
                collect_entries(child, master_did, serializer, entries)?;
            }
        }
        other => {
            tracing::warn!("dropping requirement with no presentation mapping: {other:?}");
        }
    }
    Ok(())
}

/// First-fit grouping by subject DID, honoring exclusivity both ways: an
/// entry never joins a group that excludes its descriptor id, and never
/// joins a group holding a descriptor its own exclusivity list names.
fn group_entries(entries: Vec<PresentationEntry>) -> Vec<SubmissionGroup> {
    let mut groups: Vec<SubmissionGroup> = Vec::new();

    for entry in entries {
        match groups.iter_mut().find(|group| group.accepts(&entry)) {
            Some(group) => group.push(entry),
            None => {
                let mut group = SubmissionGroup {
                    subject: entry.subject.clone(),
                    entries: Vec::new(),
                    excluded: HashSet::new(),
                };
                group.push(entry);
                groups.push(group);
            }
        }
    }

    groups
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::requirement::{
        GroupOperator, GroupRequirement, PresentationExchangeVerifiedIdRequirement,
        VerifiedIdRequirement,
    };
    use crate::core::verified_id::{VerifiableCredential, VerifiedId};
    use crate::holder::identifier::{HolderIdentifier, IdentifierError};
    use crate::holder::jose::JwsToken;
    use crate::holder::key_store::InMemoryKeyStore;
    use base64::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn raw_credential(credential_type: &str, subject: &str) -> String {
        let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256"}"#);
        let payload = BASE64_URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&json!({
                "jti": format!("urn:uuid:{credential_type}"),
                "iss": "did:example:issuer",
                "sub": subject,
                "vc": {
                    "type": ["VerifiableCredential", credential_type],
                    "credentialSubject": { "name": "Jane Roe" }
                }
            }))
            .unwrap(),
        );
        format!("{header}.{payload}.signature")
    }

    fn verified_id(credential_type: &str, subject: &str) -> VerifiedId {
        VerifiedId::VerifiableCredential(
            VerifiableCredential::from_raw_token(
                raw_credential(credential_type, subject),
                Default::default(),
                HashMap::new(),
            )
            .unwrap(),
        )
    }

    fn pe_requirement(
        descriptor_id: &str,
        credential_type: &str,
        subject: &str,
        exclusive_with: Vec<String>,
    ) -> Requirement {
        let mut requirement = VerifiedIdRequirement::new(
            descriptor_id,
            vec![credential_type.to_string()],
            Vec::new(),
            true,
            false,
            None,
            Vec::new(),
            None,
        );
        requirement
            .fulfill(verified_id(credential_type, subject))
            .unwrap();

        Requirement::PresentationExchange(PresentationExchangeVerifiedIdRequirement {
            requirement,
            input_descriptor_id: descriptor_id.to_string(),
            format: "jwt_vc".to_string(),
            exclusive_presentation_with: exclusive_with,
        })
    }

    fn wallet(dids: &[&str]) -> (PresentationResponseFormatter, IdentifierFactory, Jwk) {
        let mut store = InMemoryKeyStore::new();
        let mut identifiers = Vec::new();
        let mut master_public = None;
        for (i, did) in dids.iter().enumerate() {
            let reference = format!("key-{i}");
            let public = store.generate(&reference);
            if master_public.is_none() {
                master_public = Some(public);
            }
            identifiers.push(HolderIdentifier::new(*did, reference, "ES256", true));
        }
        (
            PresentationResponseFormatter::new(TokenSigner::new(Arc::new(store))),
            IdentifierFactory::new(identifiers),
            master_public.unwrap(),
        )
    }

    #[tokio::test]
    async fn same_subject_credentials_share_a_presentation() {
        let (formatter, identifiers, master_public) = wallet(&["did:example:holder"]);
        let tree = Requirement::Group(GroupRequirement::new(
            true,
            vec![
                pe_requirement("d1", "Passport", "did:example:holder", vec![]),
                pe_requirement("d2", "IdCard", "did:example:holder", vec![]),
            ],
            GroupOperator::All,
        ));

        let response = formatter
            .format("definition-1", "did:example:verifier", "nonce-1", &tree, &identifiers)
            .await
            .unwrap();

        assert_eq!(response.vp_tokens.len(), 1);

        let vp = JwsToken::parse(&response.vp_tokens[0]).unwrap();
        vp.verify(&master_public).unwrap();
        let vp_claims: serde_json::Value = vp.claims().unwrap();
        assert_eq!(vp_claims["iss"], "did:example:holder");
        assert_eq!(vp_claims["sub"], "did:example:holder");
        assert_eq!(vp_claims["nonce"], "nonce-1");
        assert_eq!(
            vp_claims["vp"]["verifiableCredential"].as_array().unwrap().len(),
            2
        );

        let id_token = JwsToken::parse(&response.id_token).unwrap();
        let id_claims: serde_json::Value = id_token.claims().unwrap();
        assert_eq!(id_claims["iss"], "https://self-issued.me");
        assert!(id_claims["_vp_token"].is_array());
        assert_eq!(id_claims["_vp_token"].as_array().unwrap().len(), 1);
        let map = &id_claims["_vp_token"][0]["presentation_submission"]["descriptor_map"];
        assert_eq!(map[0]["path"], "$[0]");
        assert_eq!(map[0]["format"], "jwt_vp");
        assert_eq!(map[0]["path_nested"]["path"], "$.verifiableCredential[0]");
        assert_eq!(map[1]["path"], "$[0]");
        assert_eq!(map[1]["path_nested"]["path"], "$.verifiableCredential[1]");
    }

    #[tokio::test]
    async fn different_subjects_split_presentations() {
        let (formatter, identifiers, _) =
            wallet(&["did:example:alpha", "did:example:beta"]);
        let tree = Requirement::Group(GroupRequirement::new(
            true,
            vec![
                pe_requirement("d1", "Passport", "did:example:alpha", vec![]),
                pe_requirement("d2", "IdCard", "did:example:beta", vec![]),
            ],
            GroupOperator::All,
        ));

        let response = formatter
            .format("definition-1", "did:example:verifier", "n", &tree, &identifiers)
            .await
            .unwrap();

        assert_eq!(response.vp_tokens.len(), 2);

        let id_claims: serde_json::Value = JwsToken::parse(&response.id_token)
            .unwrap()
            .claims()
            .unwrap();
        assert!(id_claims["_vp_token"].is_array());
        let map = &id_claims["_vp_token"][0]["presentation_submission"]["descriptor_map"];
        assert_eq!(map[0]["path"], "$[0]");
        assert_eq!(map[1]["path"], "$[1]");
    }

    #[tokio::test]
    async fn exclusive_descriptors_never_share_a_presentation() {
        let (formatter, identifiers, _) = wallet(&["did:example:holder"]);
        let tree = Requirement::Group(GroupRequirement::new(
            true,
            vec![
                pe_requirement("d1", "Passport", "did:example:holder", vec!["d2".into()]),
                pe_requirement("d2", "IdCard", "did:example:holder", vec!["d1".into()]),
            ],
            GroupOperator::All,
        ));

        let response = formatter
            .format("definition-1", "did:example:verifier", "n", &tree, &identifiers)
            .await
            .unwrap();

        // Same subject, but the exclusivity lists force two presentations.
        assert_eq!(response.vp_tokens.len(), 2);
    }

    #[tokio::test]
    async fn unknown_subject_aborts_the_whole_response() {
        let (formatter, identifiers, _) = wallet(&["did:example:holder"]);
        let tree = pe_requirement("d1", "Passport", "did:example:stranger", vec![]);

        let result = formatter
            .format("definition-1", "did:example:verifier", "n", &tree, &identifiers)
            .await;
        assert!(matches!(
            result,
            Err(FormatterError::Identifier(IdentifierError::UnknownDid(_)))
        ));
    }

    #[tokio::test]
    async fn unfulfilled_tree_fails_before_signing() {
        let (formatter, identifiers, _) = wallet(&["did:example:holder"]);
        let tree = Requirement::PresentationExchange(PresentationExchangeVerifiedIdRequirement {
            requirement: VerifiedIdRequirement::new(
                "d1",
                vec!["Passport".into()],
                Vec::new(),
                true,
                false,
                None,
                Vec::new(),
                None,
            ),
            input_descriptor_id: "d1".into(),
            format: "jwt_vc".into(),
            exclusive_presentation_with: Vec::new(),
        });

        let result = formatter
            .format("definition-1", "did:example:verifier", "n", &tree, &identifiers)
            .await;
        assert!(matches!(result, Err(FormatterError::Requirement(_))));
    }
}
