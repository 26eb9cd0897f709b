//! Core data model: the requirement tree, constraint engine, Verified ID
//! store model, and the wire shapes of the supported protocols.

pub mod constraint;
pub mod http;
pub mod input_descriptor;
pub mod manifest;
pub mod openid4vci;
pub mod presentation_submission;
pub mod requirement;
pub mod styles;
pub mod verified_id;
