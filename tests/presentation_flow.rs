//! End-to-end presentation flow: map a Presentation Exchange definition,
//! fulfill it from the credential store, and format the signed response.

mod support;

use serde_json::json;
use verified_id_wallet::core::input_descriptor::PresentationDefinition;
use verified_id_wallet::core::requirement::Requirement;
use verified_id_wallet::holder::jose::JwsToken;
use verified_id_wallet::mapper;
use verified_id_wallet::response::PresentationResponseFormatter;

fn definition() -> PresentationDefinition {
    serde_json::from_value(json!({
        "id": "definition-1",
        "input_descriptors": [
            {
                "id": "PassportDescriptor",
                "schema": [{ "uri": "Passport" }],
                "constraints": {
                    "fields": [{
                        "path": ["$.iss"],
                        "filter": { "type": "string", "pattern": "/did:example:gov/i" }
                    }]
                }
            },
            {
                "id": "IdCardDescriptor",
                "schema": [{ "uri": "IdCard" }]
            }
        ]
    }))
    .unwrap()
}

/// Assign a Verified ID to the named input descriptor, asserting the
/// assignment succeeded.
fn fulfill(
    requirement: &mut Requirement,
    descriptor_id: &str,
    verified_id: verified_id_wallet::core::verified_id::VerifiedId,
) {
    match requirement {
        Requirement::PresentationExchange(r) if r.input_descriptor_id == descriptor_id => {
            r.requirement.fulfill(verified_id).unwrap();
        }
        Requirement::Group(group) => {
            for child in &mut group.requirements {
                if let Requirement::PresentationExchange(r) = child {
                    if r.input_descriptor_id == descriptor_id {
                        r.requirement.fulfill(verified_id).unwrap();
                        return;
                    }
                }
            }
            panic!("descriptor `{descriptor_id}` not found in group");
        }
        other => panic!("unexpected requirement shape: {other:?}"),
    }
}

#[tokio::test]
async fn mapped_definition_is_fulfilled_and_presented() {
    let wallet = support::wallet(&["did:example:holder"]);
    let mut requirement = mapper::presentation::requirements(&definition()).unwrap();

    fulfill(
        &mut requirement,
        "PassportDescriptor",
        support::verified_id("Passport", "did:example:gov", "did:example:holder"),
    );
    fulfill(
        &mut requirement,
        "IdCardDescriptor",
        support::verified_id("IdCard", "did:example:city", "did:example:holder"),
    );

    let response = PresentationResponseFormatter::new(wallet.signer)
        .format(
            "definition-1",
            "did:example:verifier",
            "nonce-1",
            &requirement,
            &wallet.identifiers,
        )
        .await
        .unwrap();

    // Same subject, no exclusivity: both credentials share one presentation.
    assert_eq!(response.vp_tokens.len(), 1);

    let public = &wallet.public_keys["did:example:holder"];
    let vp = JwsToken::parse(&response.vp_tokens[0]).unwrap();
    vp.verify(public).unwrap();

    let vp_claims: serde_json::Value = vp.claims().unwrap();
    assert_eq!(vp_claims["iss"], "did:example:holder");
    assert_eq!(vp_claims["aud"], "did:example:verifier");
    assert_eq!(vp_claims["nonce"], "nonce-1");
    assert_eq!(vp_claims["vp"]["type"], json!(["VerifiablePresentation"]));
    assert_eq!(
        vp_claims["vp"]["verifiableCredential"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    let id_token = JwsToken::parse(&response.id_token).unwrap();
    id_token.verify(public).unwrap();
    let id_claims: serde_json::Value = id_token.claims().unwrap();
    assert_eq!(id_claims["iss"], "https://self-issued.me");
    assert_eq!(id_claims["sub"], "did:example:holder");

    assert!(id_claims["_vp_token"].is_array());
    let submission = &id_claims["_vp_token"][0]["presentation_submission"];
    assert_eq!(submission["definition_id"], "definition-1");
    let map = submission["descriptor_map"].as_array().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[0]["id"], "PassportDescriptor");
    assert_eq!(map[0]["format"], "jwt_vp");
    assert_eq!(map[0]["path"], "$[0]");
    assert_eq!(map[0]["path_nested"]["format"], "jwt_vc");
    assert_eq!(map[0]["path_nested"]["path"], "$.verifiableCredential[0]");
    assert_eq!(map[1]["id"], "IdCardDescriptor");
    assert_eq!(map[1]["path_nested"]["path"], "$.verifiableCredential[1]");
}

#[test]
fn constraints_reject_non_matching_credentials() {
    let mut requirement = mapper::presentation::requirements(&definition()).unwrap();

    let Requirement::Group(group) = &mut requirement else {
        panic!("expected a group");
    };
    let Requirement::PresentationExchange(passport) = &mut group.requirements[0] else {
        panic!("expected a presentation exchange requirement");
    };

    // Wrong type: the descriptor wants a Passport.
    let wrong_type = support::verified_id("IdCard", "did:example:gov", "did:example:holder");
    assert!(passport.requirement.fulfill(wrong_type).is_err());

    // Right type, wrong issuer for the `$.iss` pattern field.
    let wrong_issuer =
        support::verified_id("Passport", "did:example:forger", "did:example:holder");
    assert!(!passport.requirement.does_match(&wrong_issuer));
    assert!(passport.requirement.fulfill(wrong_issuer).is_err());

    let matching = support::verified_id("Passport", "did:example:gov", "did:example:holder");
    assert!(passport.requirement.fulfill(matching).is_ok());
}

#[tokio::test]
async fn cross_definition_credentials_are_presented_separately() {
    let wallet = support::wallet(&["did:example:holder"]);

    let first: PresentationDefinition = serde_json::from_value(json!({
        "id": "definition-1",
        "input_descriptors": [{ "id": "d1", "schema": [{ "uri": "Passport" }] }]
    }))
    .unwrap();
    let second: PresentationDefinition = serde_json::from_value(json!({
        "id": "definition-2",
        "input_descriptors": [{ "id": "d2", "schema": [{ "uri": "IdCard" }] }]
    }))
    .unwrap();

    let mut requirement =
        mapper::presentation::requirements_for_definitions(&[first, second]).unwrap();

    fulfill(
        &mut requirement,
        "d1",
        support::verified_id("Passport", "did:example:gov", "did:example:holder"),
    );
    fulfill(
        &mut requirement,
        "d2",
        support::verified_id("IdCard", "did:example:city", "did:example:holder"),
    );

    let response = PresentationResponseFormatter::new(wallet.signer)
        .format(
            "definition-1",
            "did:example:verifier",
            "nonce-1",
            &requirement,
            &wallet.identifiers,
        )
        .await
        .unwrap();

    // One subject, but mutual exclusivity splits the presentations.
    assert_eq!(response.vp_tokens.len(), 2);
}
