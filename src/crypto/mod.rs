//! Cryptographic primitives behind the key store.
//!
//! Key generation and PEM parsing sit behind [`CryptoProvider`] so the
//! store's lifecycle rules do not depend on a particular RSA backend.

pub mod jwk;
pub mod provider;
pub mod token;

use anyhow::{Result, bail};
use zeroize::Zeroizing;

pub use jwk::{Jwk, JwkParams, JwkSet, KeyUse};
pub use provider::RsaProvider;
pub use token::generate_token;

/// Default RSA modulus size in bits.
pub const DEFAULT_KEY_BITS: usize = 4096;
/// Smallest modulus accepted for generation.
pub const MIN_KEY_BITS: usize = 2048;
/// The only signing algorithm advertised in published JWKs.
pub const JWK_ALG: &str = "RS256";

/// Backend for the three asymmetric primitives the key store needs.
pub trait CryptoProvider {
    /// Generates a fresh private key and returns it PEM encoded.
    fn generate_private_key(&self, bits: usize) -> Result<Zeroizing<String>>;

    /// Derives the PEM encoded public key belonging to `private_pem`.
    fn derive_public_key(&self, private_pem: &str) -> Result<String>;

    /// Converts a PEM encoded public key into its JWK parameters.
    fn pem_to_jwk(&self, public_pem: &str) -> Result<JwkParams>;

    /// Fails unless `private_pem` is the private half of `public`.
    fn check_key_pair(&self, private_pem: &str, public: &JwkParams) -> Result<()> {
        let derived = self.derive_public_key(private_pem)?;
        let derived = self.pem_to_jwk(&derived)?;
        if &derived != public {
            bail!("private key does not belong to the public key");
        }
        Ok(())
    }
}
