//! Holder-side identity and crypto: identifiers, key storage, JOSE
//! primitives, and the token signer the response formatters build on.

pub mod identifier;
pub mod jose;
pub mod key_store;
pub mod signer;

pub use identifier::{HolderIdentifier, IdentifierFactory};
pub use jose::{Jwk, JwsToken, JwsType};
pub use key_store::KeyStore;
pub use signer::TokenSigner;
