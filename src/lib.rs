//! Holder-side Verified ID wallet library.
//!
//! This library implements the protocol-agnostic core of a Verified ID
//! holder wallet: it resolves raw requests (issuance contracts, OpenID
//! Presentation Exchange definitions, OpenID4VCI credential offers) into a
//! uniform [requirement tree](core::requirement::Requirement), lets the
//! holder fulfill it, and formats signed responses back to the requester.
//!
//! # Issuance usage
//!
//! ```ignore
//! use verified_id_wallet::mapper;
//! use verified_id_wallet::response::IssuanceResponseFormatter;
//!
//! // Fetch and map the contract into requirements.
//! let contract = holder.fetch_contract(&contract_url).await?;
//! let mut requirement = mapper::manifest::requirements(&contract)?;
//!
//! // Fulfill interactively, then format and submit the signed response.
//! let formatter = IssuanceResponseFormatter::new(signer);
//! let response = formatter.format(&contract, &requirement, &identifier).await?;
//! let raw_vc = holder.submit_issuance_response(&contract, response).await?;
//! ```
//!
//! # Presentation usage
//!
//! ```ignore
//! use verified_id_wallet::mapper;
//! use verified_id_wallet::response::PresentationResponseFormatter;
//!
//! let mut requirement = mapper::presentation::requirements(&definition)?;
//! // Assign matching Verified IDs from the holder's store...
//!
//! let formatter = PresentationResponseFormatter::new(signer);
//! let response = formatter
//!     .format(&definition.id, &audience, &nonce, &requirement, &identifiers)
//!     .await?;
//! holder.submit_presentation_response(&response_uri, response, state).await?;
//! ```

pub mod core;
pub mod holder;
pub mod mapper;
pub mod response;
pub mod utils;
pub mod wallet;

pub use wallet::Holder;
