//! Mapping Presentation Exchange definitions into the requirement tree.

use crate::core::constraint::{
    Constraint, ConstraintOperator, GroupConstraint, VcPathRegexConstraint, VcTypeConstraint,
};
use crate::core::input_descriptor::{InputDescriptor, PresentationDefinition};
use crate::core::requirement::{
    GroupOperator, PresentationExchangeVerifiedIdRequirement, Requirement, VerifiedIdRequirement,
};
use crate::mapper::{collapse, MappingError};

const DEFAULT_CLAIM_FORMAT: &str = "jwt_vc";

/// Map one presentation definition into a requirement tree.
///
/// A definition with a single input descriptor maps to one unwrapped
/// requirement. A definition with several descriptors maps to an ANY group:
/// the holder may satisfy any one matching descriptor, reflecting the
/// submission-requirement semantics this protocol family uses.
pub fn requirements(definition: &PresentationDefinition) -> Result<Requirement, MappingError> {
    if definition.input_descriptors.is_empty() {
        return Err(MappingError::UnsupportedRequirementType);
    }

    let mapped = definition
        .input_descriptors
        .iter()
        .map(|descriptor| descriptor_requirement(definition, descriptor, &[]))
        .collect::<Result<Vec<_>, _>>()?;

    // collapse cannot yield None here: the descriptor list is non-empty.
    collapse(mapped, GroupOperator::Any).ok_or(MappingError::UnsupportedRequirementType)
}

/// Map a request carrying several presentation definitions.
///
/// Credentials answering different definitions must not share a Verifiable
/// Presentation, so each definition's requirements are marked mutually
/// exclusive with every descriptor of the other definitions. The definitions
/// themselves collapse into an ALL group.
pub fn requirements_for_definitions(
    definitions: &[PresentationDefinition],
) -> Result<Requirement, MappingError> {
    if definitions.is_empty() {
        return Err(MappingError::UnsupportedRequirementType);
    }

    let mut mapped = Vec::new();
    for (i, definition) in definitions.iter().enumerate() {
        let foreign_descriptor_ids: Vec<String> = definitions
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, d)| d.input_descriptors.iter().map(|desc| desc.id.clone()))
            .collect();

        if definition.input_descriptors.is_empty() {
            return Err(MappingError::UnsupportedRequirementType);
        }

        let per_definition = definition
            .input_descriptors
            .iter()
            .map(|descriptor| {
                descriptor_requirement(definition, descriptor, &foreign_descriptor_ids)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(requirement) = collapse(per_definition, GroupOperator::Any) {
            mapped.push(requirement);
        }
    }

    collapse(mapped, GroupOperator::All).ok_or(MappingError::UnsupportedRequirementType)
}

fn descriptor_requirement(
    definition: &PresentationDefinition,
    descriptor: &InputDescriptor,
    exclusive_with: &[String],
) -> Result<Requirement, MappingError> {
    let types = descriptor.credential_types();
    if types.is_empty() {
        return Err(MappingError::MalformedInput(format!(
            "input descriptor `{}` carries no schema or type entries",
            descriptor.id
        )));
    }

    let issuance_options = descriptor
        .issuance
        .iter()
        .filter_map(|hint| hint.manifest.clone())
        .collect();

    let requirement = VerifiedIdRequirement::new(
        &descriptor.id,
        types.clone(),
        Vec::new(),
        true,
        false,
        descriptor
            .purpose
            .clone()
            .or_else(|| definition.purpose.clone()),
        issuance_options,
        Some(descriptor_constraint(descriptor, types)),
    );

    Ok(Requirement::PresentationExchange(
        PresentationExchangeVerifiedIdRequirement {
            requirement,
            input_descriptor_id: descriptor.id.clone(),
            format: claim_format(descriptor),
            exclusive_presentation_with: exclusive_with.to_vec(),
        },
    ))
}

/// Build the constraint tree of a descriptor: the requested credential types
/// (any of them) plus a path/regex predicate per pattern-filtered field.
fn descriptor_constraint(descriptor: &InputDescriptor, types: Vec<String>) -> Constraint {
    let mut type_constraints: Vec<Constraint> = types
        .into_iter()
        .map(|vc_type| Constraint::VcType(VcTypeConstraint { vc_type }))
        .collect();
    let type_constraint = if type_constraints.len() == 1 {
        type_constraints.remove(0)
    } else {
        Constraint::Group(GroupConstraint {
            constraints: type_constraints,
            operator: ConstraintOperator::Any,
        })
    };

    let mut constraints = vec![type_constraint];

    for field in &descriptor.constraints.fields {
        // Type-path fields already contributed to the type constraint.
        if field.path.iter().any(|path| path.contains("type")) {
            continue;
        }
        if let Some(pattern) = field.filter.as_ref().and_then(|f| f.pattern.as_ref()) {
            constraints.push(Constraint::VcPathRegex(VcPathRegexConstraint::new(
                field.path.clone(),
                pattern,
            )));
        }
    }

    if constraints.len() == 1 {
        constraints.remove(0)
    } else {
        Constraint::Group(GroupConstraint {
            constraints,
            operator: ConstraintOperator::All,
        })
    }
}

fn claim_format(descriptor: &InputDescriptor) -> String {
    descriptor
        .format
        .as_ref()
        .and_then(|format| format.as_object())
        .and_then(|map| map.keys().next().cloned())
        .unwrap_or_else(|| DEFAULT_CLAIM_FORMAT.to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn definition(descriptors: serde_json::Value) -> PresentationDefinition {
        serde_json::from_value(json!({
            "id": "definition-1",
            "input_descriptors": descriptors
        }))
        .unwrap()
    }

    #[test]
    fn single_descriptor_is_unwrapped() {
        let definition = definition(json!([{
            "id": "PassportDescriptor",
            "schema": [{ "uri": "Passport" }]
        }]));

        let Requirement::PresentationExchange(requirement) =
            requirements(&definition).unwrap()
        else {
            panic!("expected an unwrapped presentation exchange requirement");
        };
        assert_eq!(requirement.input_descriptor_id, "PassportDescriptor");
        assert_eq!(requirement.format, "jwt_vc");
        assert_eq!(requirement.requirement.types, vec!["Passport".to_string()]);
        assert!(requirement.exclusive_presentation_with.is_empty());
    }

    #[test]
    fn multiple_descriptors_become_any_group() {
        let definition = definition(json!([
            { "id": "d1", "schema": [{ "uri": "Passport" }] },
            { "id": "d2", "schema": [{ "uri": "IdCard" }] }
        ]));

        let Requirement::Group(group) = requirements(&definition).unwrap() else {
            panic!("expected a group");
        };
        assert!(matches!(group.operator, GroupOperator::Any));
        assert_eq!(group.requirements.len(), 2);
    }

    #[test]
    fn descriptor_without_types_is_malformed() {
        let definition = definition(json!([{
            "id": "d1",
            "constraints": { "fields": [{ "path": ["$.vc.credentialSubject.name"] }] }
        }]));

        assert!(matches!(
            requirements(&definition),
            Err(MappingError::MalformedInput(_))
        ));
    }

    #[test]
    fn pattern_fields_become_path_regex_constraints() {
        let definition = definition(json!([{
            "id": "d1",
            "schema": [{ "uri": "Passport" }],
            "constraints": {
                "fields": [{
                    "path": ["$.iss"],
                    "filter": { "type": "string", "pattern": "did:example:123" }
                }]
            }
        }]));

        let Requirement::PresentationExchange(requirement) =
            requirements(&definition).unwrap()
        else {
            panic!("expected a presentation exchange requirement");
        };

        let Some(Constraint::Group(group)) = &requirement.requirement.constraint else {
            panic!("expected a constraint group");
        };
        assert!(matches!(group.operator, ConstraintOperator::All));
        assert_eq!(group.constraints.len(), 2);
    }

    #[test]
    fn cross_definition_requirements_are_mutually_exclusive() {
        let first = definition(json!([{ "id": "d1", "schema": [{ "uri": "Passport" }] }]));
        let mut second =
            definition(json!([{ "id": "d2", "schema": [{ "uri": "IdCard" }] }]));
        second.id = "definition-2".into();

        let Requirement::Group(group) =
            requirements_for_definitions(&[first, second]).unwrap()
        else {
            panic!("expected a group");
        };
        assert!(matches!(group.operator, GroupOperator::All));

        let Requirement::PresentationExchange(first) = &group.requirements[0] else {
            panic!("expected a presentation exchange requirement");
        };
        assert_eq!(first.exclusive_presentation_with, vec!["d2".to_string()]);

        let Requirement::PresentationExchange(second) = &group.requirements[1] else {
            panic!("expected a presentation exchange requirement");
        };
        assert_eq!(second.exclusive_presentation_with, vec!["d1".to_string()]);
    }
}
