//! Constraint predicates over stored Verified IDs.
//!
//! A [Constraint] tests whether a stored Verified ID can satisfy a
//! presentation requirement. [Constraint::does_match] is a pure, total
//! predicate; [Constraint::matches] is its assertive counterpart used at
//! response-assembly time, producing a typed error when the predicate fails.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json_path::JsonPath;

use crate::core::verified_id::VerifiedId;
use crate::utils::NonEmptyVec;

/// Constraint mismatch, surfaced only at the assertive call site.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConstraintError {
    /// The Verified ID does not carry the requested credential type.
    #[error("verified id does not carry requested type `{0}`")]
    VcTypeMismatch(String),

    /// The Verified ID was issued by a party the request did not accept.
    #[error("verified id issuer `{0}` is not one of the requested issuers")]
    IssuerNotRequested(String),

    /// No value extracted at the constraint paths matched the pattern.
    #[error("no match for path regex constraint `{pattern}`")]
    NoPathRegexMatch { pattern: String },

    /// A constraint group was not satisfied under its operator.
    #[error("verified id does not satisfy the constraint group")]
    GroupNotSatisfied,
}

/// Combinator for [GroupConstraint] children.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConstraintOperator {
    All,
    Any,
}

/// Requires the Verified ID to carry a given credential type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VcTypeConstraint {
    pub vc_type: String,
}

/// Requires a value extracted from the credential JSON at one of `path` to
/// match `pattern`.
///
/// Request issuers emit patterns in the JavaScript regex-literal convention
/// (`/pattern/flags`); the literal wrapping is stripped before compiling.
/// Matching is a case-insensitive search, not a full match. An empty
/// extraction is a non-match, never an error.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VcPathRegexConstraint {
    pub path: NonEmptyVec<String>,
    pub pattern: String,
}

/// Combines child constraints under an ALL or ANY operator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupConstraint {
    pub constraints: Vec<Constraint>,
    pub operator: ConstraintOperator,
}

/// A stateless predicate over a [VerifiedId].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Constraint {
    VcType(VcTypeConstraint),
    VcPathRegex(VcPathRegexConstraint),
    Group(GroupConstraint),
}

impl Constraint {
    /// Pure, total predicate: does the Verified ID satisfy this constraint?
    pub fn does_match(&self, verified_id: &VerifiedId) -> bool {
        match self {
            Self::VcType(c) => verified_id.types().iter().any(|t| t == &c.vc_type),
            Self::VcPathRegex(c) => c.does_match(verified_id),
            Self::Group(g) => match g.operator {
                ConstraintOperator::All => {
                    g.constraints.iter().all(|c| c.does_match(verified_id))
                }
                ConstraintOperator::Any => {
                    g.constraints.iter().any(|c| c.does_match(verified_id))
                }
            },
        }
    }

    /// Assertive counterpart of [Constraint::does_match], producing a typed
    /// error naming the first failing predicate.
    pub fn matches(&self, verified_id: &VerifiedId) -> Result<(), ConstraintError> {
        match self {
            Self::VcType(c) => {
                if verified_id.types().iter().any(|t| t == &c.vc_type) {
                    Ok(())
                } else {
                    Err(ConstraintError::VcTypeMismatch(c.vc_type.clone()))
                }
            }
            Self::VcPathRegex(c) => {
                if c.does_match(verified_id) {
                    Ok(())
                } else {
                    Err(ConstraintError::NoPathRegexMatch {
                        pattern: c.pattern.clone(),
                    })
                }
            }
            Self::Group(g) => match g.operator {
                ConstraintOperator::All => {
                    for child in &g.constraints {
                        child.matches(verified_id)?;
                    }
                    Ok(())
                }
                ConstraintOperator::Any => {
                    if g.constraints.iter().any(|c| c.does_match(verified_id)) {
                        Ok(())
                    } else {
                        Err(ConstraintError::GroupNotSatisfied)
                    }
                }
            },
        }
    }
}

impl VcPathRegexConstraint {
    pub fn new(path: NonEmptyVec<String>, pattern: impl Into<String>) -> Self {
        Self {
            path,
            pattern: pattern.into(),
        }
    }

    fn does_match(&self, verified_id: &VerifiedId) -> bool {
        let Some(regex) = compile_pattern(&self.pattern) else {
            return false;
        };

        let content = verified_id.content_json();

        self.path.iter().any(|path| {
            let Ok(json_path) = JsonPath::parse(path) else {
                return false;
            };

            json_path.query(&content).iter().any(|value| {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                regex.is_match(&text)
            })
        })
    }
}

/// Strip the JavaScript regex-literal wrapping from a pattern, if present.
///
/// `/pattern/flags` becomes `pattern`; the flags tail is discarded since the
/// engine always searches case-insensitively. A pattern not in literal form
/// is returned unchanged, so a bare pattern containing `/` is not mangled.
fn strip_regex_literal(pattern: &str) -> &str {
    if let Some(body) = pattern.strip_prefix('/') {
        if let Some(end) = body.rfind('/') {
            return &body[..end];
        }
    }
    pattern
}

fn compile_pattern(pattern: &str) -> Option<regex::Regex> {
    RegexBuilder::new(strip_regex_literal(pattern))
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            tracing::debug!("invalid constraint pattern `{pattern}`: {e}");
            e
        })
        .ok()
}
