//! Presentation submission wire shapes.
//!
//! A presentation submission expresses how the credentials presented in a
//! response map back to the input descriptors of the request's presentation
//! definition. The field names here are protocol-mandated and must be
//! produced exactly.
//!
//! See: <https://identity.foundation/presentation-exchange/spec/v2.0.0/#presentation-submission>

use serde::{Deserialize, Serialize};

/// A `presentation_submission` object embedded in a signed response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    /// Unique identifier of this submission.
    pub id: uuid::Uuid,
    /// The id of the presentation definition this submission answers.
    pub definition_id: String,
    pub descriptor_map: Vec<DescriptorMap>,
}

impl PresentationSubmission {
    pub fn new(definition_id: impl Into<String>, descriptor_map: Vec<DescriptorMap>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            definition_id: definition_id.into(),
            descriptor_map,
        }
    }
}

/// One entry of a submission's descriptor map.
///
/// `path` locates the Verifiable Presentation within the response's
/// `_vp_token` array (`$[i]`); `path_nested` locates the member credential
/// within that presentation (`$.verifiableCredential[j]`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorMap {
    /// Matches the id of the input descriptor being answered.
    pub id: String,
    /// Claim format designation of the referenced entry, e.g. `jwt_vp`.
    pub format: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_nested: Option<Box<DescriptorMap>>,
}

impl DescriptorMap {
    pub fn new(
        id: impl Into<String>,
        format: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            format: format.into(),
            path: path.into(),
            path_nested: None,
        }
    }

    /// Attach a nested path locating the entry inside the value at `path`.
    /// The nested id always mirrors the parent id.
    pub fn with_path_nested(mut self, format: impl Into<String>, path: impl Into<String>) -> Self {
        self.path_nested = Some(Box::new(DescriptorMap {
            id: self.id.clone(),
            format: format.into(),
            path: path.into(),
            path_nested: None,
        }));
        self
    }
}
