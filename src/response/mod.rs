//! Response formatters.
//!
//! Formatters consume a fulfilled requirement tree and produce the signed
//! artifacts a request expects back: issuance responses, Verifiable
//! Presentations with their submission, and OpenID4VCI proofs. Validation
//! always precedes signing; a tree that does not validate never reaches the
//! key store.

pub mod issuance;
pub mod presentation;
pub mod proof;

use crate::core::requirement::RequirementError;
use crate::core::verified_id::VerifiedId;
use crate::holder::identifier::IdentifierError;
use crate::holder::signer::SigningError;

pub use issuance::IssuanceResponseFormatter;
pub use presentation::{PresentationResponse, PresentationResponseFormatter};
pub use proof::ProofFormatter;

/// Issuer value of a self-issued token.
pub(crate) const SELF_ISSUED: &str = "https://self-issued.me";

/// A response that could not be formatted.
#[derive(Debug, thiserror::Error)]
pub enum FormatterError {
    /// The requirement tree does not validate; nothing was signed.
    #[error(transparent)]
    Requirement(#[from] RequirementError),

    /// No identifier could be resolved for a presentation group. Aborts the
    /// whole response; partial responses are never produced.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    /// A credential could not be serialized for presentation.
    #[error("unable to serialize verified id `{id}`: {message}")]
    Serialization { id: String, message: String },

    /// A proof input failed validation; nothing was signed.
    #[error("invalid proof input: {0}")]
    InvalidProofInput(String),
}

/// Pluggable serialization of a Verified ID into its presented form.
///
/// The default [RawTokenSerializer] presents the stored signed token as-is;
/// alternative implementations can redact or re-encode.
pub trait VerifiedIdSerializer {
    type Output;

    fn serialize(&self, verified_id: &VerifiedId) -> Result<Self::Output, FormatterError>;
}

/// Presents the raw signed credential token unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawTokenSerializer;

impl VerifiedIdSerializer for RawTokenSerializer {
    type Output = String;

    fn serialize(&self, verified_id: &VerifiedId) -> Result<Self::Output, FormatterError> {
        Ok(verified_id.raw_token().to_string())
    }
}
