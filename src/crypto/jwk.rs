//! JSON Web Key representations of RSA public keys.

use serde::{Deserialize, Serialize};

use super::JWK_ALG;
use crate::layout::KeyRole;

/// Key parameters extracted from a public PEM: `kty`, `n` and `e`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkParams {
    pub kty: String,
    pub n: String,
    pub e: String,
}

/// The JWK `use` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUse {
    Sig,
    Enc,
}

impl From<KeyRole> for KeyUse {
    fn from(role: KeyRole) -> Self {
        match role {
            KeyRole::Signature => KeyUse::Sig,
            KeyRole::Encryption => KeyUse::Enc,
        }
    }
}

/// A published public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: KeyUse,
    pub alg: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    /// Builds the published form of a public key.
    ///
    /// `use` comes from the role, not the key material, and `alg` is always
    /// RS256 whatever the modulus size.
    pub fn new(role: KeyRole, params: JwkParams) -> Self {
        Self {
            kty: params.kty,
            key_use: role.into(),
            alg: JWK_ALG.to_string(),
            n: params.n,
            e: params.e,
        }
    }
}

/// The key set served to relying parties. Never holds private material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Signature key first, encryption key second.
    pub fn new(sig: Jwk, enc: Jwk) -> Self {
        Self {
            keys: vec![sig, enc],
        }
    }
}
