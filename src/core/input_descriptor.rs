//! Presentation Exchange request wire shapes.
//!
//! Input Descriptors are objects used by a verifier to describe the
//! credentials it requires of a holder. This module carries the wire shapes
//! as received; mapping them into the uniform requirement tree lives in
//! [crate::mapper::presentation].
//!
//! See: <https://identity.foundation/presentation-exchange/spec/v2.0.0/#input-descriptor-object>

use serde::{Deserialize, Serialize};

use crate::utils::NonEmptyVec;

/// A Presentation Definition: the set of input descriptors a verifier
/// requires, together with its protocol-level id echoed back in the
/// presentation submission.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PresentationDefinition {
    pub id: String,
    pub input_descriptors: Vec<InputDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// One input descriptor of a presentation definition.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct InputDescriptor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Claim format designations the verifier can process, e.g. `jwt_vc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
    #[serde(default)]
    pub constraints: Constraints,
    /// Legacy schema entries carrying the requested credential type as a
    /// URI; still emitted by older verifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema: Vec<SchemaEntry>,
    /// Contract URLs where a matching credential can be obtained, carried in
    /// the descriptor's issuance hints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuance: Vec<IssuanceHint>,
}

/// Legacy `schema` entry naming a requested credential type.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaEntry {
    pub uri: String,
}

/// Issuance hint attached to an input descriptor.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuanceHint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

/// Constraints a holder must satisfy to fulfill an input descriptor.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ConstraintsField>,
}

/// A single field constraint: JSONPath expressions plus an optional filter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstraintsField {
    pub path: NonEmptyVec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<ConstraintsFilter>,
}

/// The filter of a field constraint. This protocol family emits regex
/// `pattern` filters (JavaScript regex-literal convention) and `const`
/// equality filters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstraintsFilter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub constant: Option<String>,
}

impl InputDescriptor {
    /// The credential types requested by this descriptor.
    ///
    /// Types are read from the legacy `schema` entries first, then hinted
    /// from `type`-path field constraints carrying a `const` or `pattern`
    /// filter. May be empty, which mapping treats as malformed input.
    pub fn credential_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.schema.iter().map(|s| s.uri.clone()).collect();

        for field in &self.constraints.fields {
            if !field.path.iter().any(|path| path.contains("type")) {
                continue;
            }

            let Some(filter) = &field.filter else {
                continue;
            };

            if let Some(constant) = &filter.constant {
                types.push(constant.clone());
            } else if let Some(pattern) = &filter.pattern {
                // A bare pattern with no regex metacharacters names a single
                // type.
                let trimmed = pattern
                    .trim_start_matches('^')
                    .trim_end_matches('$')
                    .trim_start_matches('/')
                    .trim_end_matches('/');
                for candidate in trimmed
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .split('|')
                {
                    if !candidate.is_empty() {
                        types.push(candidate.to_string());
                    }
                }
            }
        }

        types
    }
}
