//! Raw request mappers.
//!
//! Pure, side-effect-free transforms from protocol wire shapes (issuance
//! contracts, Presentation Exchange definitions, OpenID4VCI offers) into the
//! uniform requirement tree and display styles. Malformed input is rejected
//! deterministically with a typed error; nothing here performs I/O.

pub mod manifest;
pub mod openid4vci;
pub mod presentation;

use crate::core::requirement::{GroupOperator, GroupRequirement, Requirement};

/// A raw request that could not be mapped.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    /// The request carries none of the supported requirement buckets.
    #[error("request carries no supported requirement types")]
    UnsupportedRequirementType,

    /// The request is structurally invalid.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A request field failed semantic validation.
    #[error("{0}")]
    Validation(String),
}

/// Collapse a bucket of mapped requirements into a single tree node.
///
/// A single requirement is returned unwrapped (no needless nesting);
/// multiple requirements are grouped under the given operator; an empty
/// bucket is the caller's error to classify.
pub(crate) fn collapse(
    mut requirements: Vec<Requirement>,
    operator: GroupOperator,
) -> Option<Requirement> {
    match requirements.len() {
        0 => None,
        1 => requirements.pop(),
        _ => Some(Requirement::Group(GroupRequirement::new(
            true,
            requirements,
            operator,
        ))),
    }
}
