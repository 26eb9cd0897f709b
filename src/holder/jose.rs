//! Minimal JOSE layer: JWK material and compact JWS tokens.
//!
//! Every signed artifact the wallet produces (issuance responses, ID tokens,
//! Verifiable Presentations, OpenID4VCI proofs) is a compact JWS over a
//! deterministic JSON claim set. Key material never leaves the key store;
//! this layer only consumes [Jwk] values handed to it by reference.

use base64::prelude::*;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// JOSE processing failure.
#[derive(Debug, thiserror::Error)]
pub enum JoseError {
    /// Token is not a three-segment compact JWS.
    #[error("malformed compact token")]
    MalformedToken,

    /// The key cannot be used for the requested operation.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// The key material is invalid.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// Claims could not be serialized or deserialized.
    #[error("claim serialization failed: {0}")]
    Serialization(String),
}

/// The JWS `typ` header, disambiguating the different JWT species the
/// wallet signs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JwsType {
    /// General purpose JWT.
    #[default]
    Jwt,
    /// OpenID4VCI proof of possession.
    OpenId4VciProofJwt,
}

impl std::fmt::Display for JwsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jwt => write!(f, "JWT"),
            Self::OpenId4VciProofJwt => write!(f, "openid4vci-proof+jwt"),
        }
    }
}

/// An EC P-256 JSON Web Key, optionally carrying the private scalar.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Build a JWK from a P-256 signing key, retaining the private scalar.
    pub fn from_p256(key: &SigningKey, kid: Option<String>) -> Self {
        let point = key.verifying_key().to_encoded_point(false);
        Self {
            kty: "EC".into(),
            crv: "P-256".into(),
            x: BASE64_URL_SAFE_NO_PAD.encode(point.x().map(|x| x.as_slice()).unwrap_or_default()),
            y: BASE64_URL_SAFE_NO_PAD.encode(point.y().map(|y| y.as_slice()).unwrap_or_default()),
            d: Some(BASE64_URL_SAFE_NO_PAD.encode(key.to_bytes())),
            kid,
        }
    }

    /// The public half of the key, safe to embed in `sub_jwk` claims.
    pub fn public(&self) -> Self {
        Self {
            d: None,
            ..self.clone()
        }
    }

    fn check_curve(&self) -> Result<(), JoseError> {
        if self.kty != "EC" || self.crv != "P-256" {
            return Err(JoseError::UnsupportedKey(format!(
                "expected an EC P-256 key, got {}/{}",
                self.kty, self.crv
            )));
        }
        Ok(())
    }

    /// The signing key, when the private scalar is present.
    pub fn signing_key(&self) -> Result<SigningKey, JoseError> {
        self.check_curve()?;
        let d = self
            .d
            .as_ref()
            .ok_or_else(|| JoseError::UnsupportedKey("key has no private material".into()))?;
        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(d)
            .map_err(|e| JoseError::InvalidKey(e.to_string()))?;
        SigningKey::from_slice(&bytes).map_err(|e| JoseError::InvalidKey(e.to_string()))
    }

    /// The verifying key, from the public coordinates.
    pub fn verifying_key(&self) -> Result<VerifyingKey, JoseError> {
        self.check_curve()?;
        let x = BASE64_URL_SAFE_NO_PAD
            .decode(&self.x)
            .map_err(|e| JoseError::InvalidKey(e.to_string()))?;
        let y = BASE64_URL_SAFE_NO_PAD
            .decode(&self.y)
            .map_err(|e| JoseError::InvalidKey(e.to_string()))?;

        let mut sec1 = Vec::with_capacity(1 + x.len() + y.len());
        sec1.push(0x04);
        sec1.extend_from_slice(&x);
        sec1.extend_from_slice(&y);
        VerifyingKey::from_sec1_bytes(&sec1).map_err(|e| JoseError::InvalidKey(e.to_string()))
    }
}

/// The protected header of a wallet-signed JWS.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// A compact JWS, held as its three base64url segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JwsToken {
    protected: String,
    payload: String,
    signature: String,
}

impl JwsToken {
    /// Serialize `claims` deterministically and sign with ES256.
    pub fn sign<T: Serialize>(claims: &T, header: &JwsHeader, key: &Jwk) -> Result<Self, JoseError> {
        let header_json =
            serde_json::to_vec(header).map_err(|e| JoseError::Serialization(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(claims).map_err(|e| JoseError::Serialization(e.to_string()))?;

        let protected = BASE64_URL_SAFE_NO_PAD.encode(header_json);
        let payload = BASE64_URL_SAFE_NO_PAD.encode(claims_json);
        let signing_input = format!("{protected}.{payload}");

        let signature: Signature = key.signing_key()?.sign(signing_input.as_bytes());

        Ok(Self {
            protected,
            payload,
            signature: BASE64_URL_SAFE_NO_PAD.encode(signature.to_bytes()),
        })
    }

    /// Parse a compact JWS without verifying it.
    pub fn parse(compact: &str) -> Result<Self, JoseError> {
        let mut segments = compact.split('.');
        let (Some(protected), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(JoseError::MalformedToken);
        };

        Ok(Self {
            protected: protected.into(),
            payload: payload.into(),
            signature: signature.into(),
        })
    }

    /// Verify the signature against the given public key.
    pub fn verify(&self, key: &Jwk) -> Result<(), JoseError> {
        let signature_bytes = BASE64_URL_SAFE_NO_PAD
            .decode(&self.signature)
            .map_err(|_| JoseError::InvalidSignature)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| JoseError::InvalidSignature)?;

        let signing_input = format!("{}.{}", self.protected, self.payload);
        key.verifying_key()?
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| JoseError::InvalidSignature)
    }

    /// The decoded protected header.
    pub fn header(&self) -> Result<JwsHeader, JoseError> {
        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(&self.protected)
            .map_err(|_| JoseError::MalformedToken)?;
        serde_json::from_slice(&bytes).map_err(|e| JoseError::Serialization(e.to_string()))
    }

    /// The raw payload bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, JoseError> {
        BASE64_URL_SAFE_NO_PAD
            .decode(&self.payload)
            .map_err(|_| JoseError::MalformedToken)
    }

    /// The decoded claim set.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T, JoseError> {
        serde_json::from_slice(&self.payload_bytes()?)
            .map_err(|e| JoseError::Serialization(e.to_string()))
    }

    /// The compact serialization `header.payload.signature`.
    pub fn compact(&self) -> String {
        format!("{}.{}.{}", self.protected, self.payload, self.signature)
    }
}
