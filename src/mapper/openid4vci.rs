//! Mapping OpenID4VCI credential offers into the requirement tree.

use url::Url;

use crate::core::openid4vci::{CredentialConfiguration, CredentialIssuerMetadata, CredentialOffer};
use crate::core::requirement::{
    AccessTokenRequirement, GroupOperator, PinRequirement, PinType, Requirement,
};
use crate::core::styles::VerifiedIdStyle;
use crate::mapper::{collapse, MappingError};

const DEFAULT_TX_CODE_LENGTH: usize = 6;

/// Map a credential offer into a requirement tree against the issuer's
/// metadata.
///
/// A pre-authorized offer always requires an access token from the issuer;
/// when the grant declares a transaction code the holder must additionally
/// supply a PIN. Both buckets collapse into an ALL group.
pub fn requirements(
    offer: &CredentialOffer,
    metadata: &CredentialIssuerMetadata,
) -> Result<Requirement, MappingError> {
    let configuration_id = first_configuration_id(offer)?;
    let configuration = configuration(metadata, configuration_id)?;

    let issuer_url = Url::parse(&offer.credential_issuer).map_err(|e| {
        MappingError::MalformedInput(format!(
            "credential issuer `{}` is not a valid url: {e}",
            offer.credential_issuer
        ))
    })?;

    let mut mapped = vec![Requirement::AccessToken(AccessTokenRequirement::new(
        configuration_id,
        true,
        false,
        issuer_url,
        None,
        configuration.scope.clone(),
        Vec::new(),
    ))];

    if let Some(tx_code) = offer
        .grants
        .as_ref()
        .and_then(|grants| grants.pre_authorized_code.as_ref())
        .and_then(|grant| grant.tx_code.as_ref())
    {
        let pin_type = match tx_code.input_mode.as_deref() {
            Some("text") => PinType::Alphanumeric,
            _ => PinType::Numeric,
        };
        mapped.push(Requirement::Pin(PinRequirement::new(
            tx_code.length.unwrap_or(DEFAULT_TX_CODE_LENGTH),
            pin_type,
            true,
        )));
    }

    collapse(mapped, GroupOperator::All).ok_or(MappingError::UnsupportedRequirementType)
}

/// The style the issued Verified ID will be rendered with, from the
/// configuration's display metadata.
pub fn verified_id_style(
    metadata: &CredentialIssuerMetadata,
    configuration: &CredentialConfiguration,
) -> VerifiedIdStyle {
    let display = configuration.display.first();
    VerifiedIdStyle {
        name: display
            .and_then(|d| d.name.clone())
            .unwrap_or_else(|| metadata.issuer_name().to_string()),
        issuer: Some(metadata.issuer_name().to_string()),
        background_color: display.and_then(|d| d.background_color.clone()),
        text_color: display.and_then(|d| d.text_color.clone()),
        description: display.and_then(|d| d.description.clone()),
        logo: None,
    }
}

/// The first offered configuration id. An offer naming no credential ids is
/// a validation error, surfaced before any token or signing work happens.
pub fn first_configuration_id(offer: &CredentialOffer) -> Result<&str, MappingError> {
    offer
        .credential_configuration_ids
        .first()
        .map(String::as_str)
        .ok_or_else(|| MappingError::Validation("Credential id is not present".into()))
}

/// Resolve a configuration id against the issuer metadata.
pub fn configuration<'a>(
    metadata: &'a CredentialIssuerMetadata,
    configuration_id: &str,
) -> Result<&'a CredentialConfiguration, MappingError> {
    metadata
        .credential_configurations_supported
        .get(configuration_id)
        .ok_or_else(|| {
            MappingError::MalformedInput(format!(
                "credential configuration `{configuration_id}` is not supported by the issuer"
            ))
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn metadata() -> CredentialIssuerMetadata {
        serde_json::from_value(json!({
            "credential_issuer": "https://issuer.example.com",
            "credential_endpoint": "https://issuer.example.com/credential",
            "credential_configurations_supported": {
                "EmployeeBadge": {
                    "format": "jwt_vc_json",
                    "scope": "employee_badge",
                    "credential_definition": { "type": ["VerifiableCredential", "EmployeeBadge"] },
                    "display": [{ "name": "Employee Badge", "background_color": "#1f2430" }]
                }
            },
            "display": [{ "name": "Example Corp" }]
        }))
        .unwrap()
    }

    fn offer(ids: Vec<&str>, tx_code: bool) -> CredentialOffer {
        let grant = if tx_code {
            json!({ "pre-authorized_code": "code-1", "tx_code": { "length": 4 } })
        } else {
            json!({ "pre-authorized_code": "code-1" })
        };
        serde_json::from_value(json!({
            "credential_issuer": "https://issuer.example.com",
            "credential_configuration_ids": ids,
            "grants": { "urn:ietf:params:oauth:grant-type:pre-authorized_code": grant }
        }))
        .unwrap()
    }

    #[test]
    fn offer_with_tx_code_requires_token_and_pin() {
        let Requirement::Group(group) =
            requirements(&offer(vec!["EmployeeBadge"], true), &metadata()).unwrap()
        else {
            panic!("expected a group");
        };
        assert!(matches!(group.operator, GroupOperator::All));
        assert!(matches!(group.requirements[0], Requirement::AccessToken(_)));
        let Requirement::Pin(pin) = &group.requirements[1] else {
            panic!("expected a pin requirement");
        };
        assert_eq!(pin.length, 4);
    }

    #[test]
    fn offer_without_tx_code_is_unwrapped() {
        let requirement =
            requirements(&offer(vec!["EmployeeBadge"], false), &metadata()).unwrap();
        assert!(matches!(requirement, Requirement::AccessToken(_)));
    }

    #[test]
    fn empty_configuration_ids_is_a_validation_error() {
        assert_eq!(
            requirements(&offer(vec![], false), &metadata()),
            Err(MappingError::Validation("Credential id is not present".into()))
        );
    }

    #[test]
    fn unknown_configuration_is_malformed() {
        assert!(matches!(
            requirements(&offer(vec!["Unknown"], false), &metadata()),
            Err(MappingError::MalformedInput(_))
        ));
    }

    #[test]
    fn style_prefers_configuration_display() {
        let metadata = metadata();
        let configuration = metadata
            .credential_configurations_supported
            .get("EmployeeBadge")
            .unwrap();
        let style = verified_id_style(&metadata, configuration);
        assert_eq!(style.name, "Employee Badge");
        assert_eq!(style.issuer.as_deref(), Some("Example Corp"));
    }
}
