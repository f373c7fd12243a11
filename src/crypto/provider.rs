use anyhow::{Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use super::{CryptoProvider, JwkParams, MIN_KEY_BITS};

/// In-process RSA backed by the `rsa` crate.
///
/// Writes PKCS#8 private keys and SubjectPublicKeyInfo public keys, the same
/// PEM flavours `openssl genrsa` and `openssl rsa -pubout` produce. Reading
/// also accepts the PKCS#1 `RSA PRIVATE KEY` / `RSA PUBLIC KEY` forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaProvider;

impl RsaProvider {
    fn parse_private(pem: &str) -> Result<RsaPrivateKey> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| anyhow!("not an RSA private key: {e}"))
    }

    fn parse_public(pem: &str) -> Result<RsaPublicKey> {
        RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| anyhow!("not an RSA public key: {e}"))
    }
}

impl CryptoProvider for RsaProvider {
    fn generate_private_key(&self, bits: usize) -> Result<Zeroizing<String>> {
        if bits < MIN_KEY_BITS {
            bail!("refusing to generate a {bits}-bit RSA key (minimum {MIN_KEY_BITS})");
        }

        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| anyhow!("RSA key generation failed: {e}"))?;

        key.to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| anyhow!("failed to encode private key: {e}"))
    }

    fn derive_public_key(&self, private_pem: &str) -> Result<String> {
        let key = Self::parse_private(private_pem)?;

        key.to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| anyhow!("failed to encode public key: {e}"))
    }

    fn pem_to_jwk(&self, public_pem: &str) -> Result<JwkParams> {
        let key = Self::parse_public(public_pem)?;

        Ok(JwkParams {
            kty: "RSA".to_string(),
            n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
        })
    }
}
