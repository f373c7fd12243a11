//! Local RSA key-pair and setup-token lifecycle for an authentication service.
//!
//! A [`KeyStore`] owns a `keys/` directory holding a signature key pair, an
//! encryption key pair and a one-time setup token:
//!
//! ```text
//! <base>/keys/sig.rsa.pub.pem
//! <base>/keys/sig.rsa.prv.pem
//! <base>/keys/enc.rsa.pub.pem
//! <base>/keys/enc.rsa.prv.pem
//! <base>/keys/setup.token
//! ```
//!
//! Generation is destructive: it replaces whatever is on disk without asking.
//! It is meant for a bootstrap step run once, by one process, before the
//! service starts. Files are replaced atomically, but two concurrent
//! generators targeting the same directory still race and the last writer
//! wins per file.

pub mod crypto;
mod error;
pub mod layout;
mod storage;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

pub use crate::crypto::{
    CryptoProvider, DEFAULT_KEY_BITS, Jwk, JwkParams, JwkSet, KeyUse, RsaProvider,
};
pub use crate::error::{BoxError, KeyStoreError};
pub use crate::layout::{KeyKind, KeyRole, Layout, PemPaths};
use crate::storage::Storage;

pub type Result<T, E = KeyStoreError> = std::result::Result<T, E>;

/// A key pair read back from disk.
pub struct KeyPair {
    role: KeyRole,
    public_pem: String,
    private_pem: Zeroizing<String>,
    public_jwk: Jwk,
}

impl KeyPair {
    pub fn role(&self) -> KeyRole {
        self.role
    }

    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    pub fn private_pem(&self) -> &str {
        &self.private_pem
    }

    /// The published form of the public key, always computed from
    /// [`public_pem`](Self::public_pem).
    pub fn public_jwk(&self) -> &Jwk {
        &self.public_jwk
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("role", &self.role)
            .field("public_pem", &self.public_pem)
            .field("private_pem", &"<redacted>")
            .field("public_jwk", &self.public_jwk)
            .finish()
    }
}

/// Result of [`KeyStore::load_key_pairs`].
#[derive(Debug)]
pub struct LoadedKeys {
    pub sig: KeyPair,
    pub enc: KeyPair,
    /// Public keys only: signature first, encryption second.
    pub jwks: JwkSet,
}

/// Presence of one managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: PathBuf,
    pub present: bool,
}

struct GeneratedPair {
    public_pem: String,
    private_pem: Zeroizing<String>,
}

/// Façade over the key directory.
///
/// Holds only derived paths and configuration; every operation goes to disk.
#[derive(Debug, Clone)]
pub struct KeyStore<P = RsaProvider> {
    layout: Layout,
    key_bits: usize,
    provider: P,
}

impl KeyStore<RsaProvider> {
    /// Key store rooted at `base`; material lives in `base/keys`.
    ///
    /// Does not touch the filesystem.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self::with_provider(base, RsaProvider)
    }

    /// Key store rooted at the process working directory, resolved once here.
    pub fn from_current_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }
}

impl<P: CryptoProvider> KeyStore<P> {
    pub fn with_provider(base: impl AsRef<Path>, provider: P) -> Self {
        Self {
            layout: Layout::new(base),
            key_bits: DEFAULT_KEY_BITS,
            provider,
        }
    }

    /// Overrides the RSA modulus size used by generation.
    pub fn with_key_bits(mut self, bits: usize) -> Self {
        self.key_bits = bits;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn directory(&self) -> &Path {
        self.layout.directory()
    }

    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// Generates fresh signature and encryption key pairs and writes them,
    /// replacing any existing key files without confirmation.
    ///
    /// Both pairs are produced in memory before anything is written, so a
    /// failure in either role leaves the directory untouched.
    pub fn generate_key_pairs(&self) -> Result<()> {
        let existing: Vec<_> = self
            .layout
            .pem_files()
            .into_iter()
            .filter(|p| p.exists())
            .collect();
        if !existing.is_empty() {
            warn!(
                directory = %self.directory().display(),
                files = existing.len(),
                "overwriting existing key files"
            );
        }

        let sig = self.generate_pair(KeyRole::Signature)?;
        let enc = self.generate_pair(KeyRole::Encryption)?;

        self.write_pair(KeyRole::Signature, &sig)?;
        self.write_pair(KeyRole::Encryption, &enc)?;

        info!(
            directory = %self.directory().display(),
            bits = self.key_bits,
            "generated signature and encryption key pairs"
        );
        Ok(())
    }

    /// Like [`generate_key_pairs`](Self::generate_key_pairs) but refuses to
    /// replace anything: fails with [`KeyStoreError::KeyExists`] naming the
    /// first key file already present.
    ///
    /// The check is advisory: a writer racing between the check and the
    /// rename can still be overwritten, as with any concurrent generation.
    pub fn generate_key_pairs_exclusive(&self) -> Result<()> {
        if let Some(path) = self.layout.pem_files().into_iter().find(|p| p.exists()) {
            return Err(KeyStoreError::KeyExists {
                path: path.to_path_buf(),
            });
        }
        self.generate_key_pairs()
    }

    /// Reads both key pairs from disk and builds the published JWK Set.
    ///
    /// Nothing is cached; every call re-reads and re-converts.
    pub fn load_key_pairs(&self) -> Result<LoadedKeys> {
        let sig = self.load_key_pair(KeyRole::Signature)?;
        let enc = self.load_key_pair(KeyRole::Encryption)?;

        let jwks = JwkSet::new(sig.public_jwk.clone(), enc.public_jwk.clone());

        Ok(LoadedKeys { sig, enc, jwks })
    }

    /// Reads and validates a single key pair.
    pub fn load_key_pair(&self, role: KeyRole) -> Result<KeyPair> {
        load_key_pair(&self.provider, role, self.layout.pem_paths(role))
    }

    /// Writes a new random setup token, replacing any existing one, and
    /// returns it for one-time display.
    pub fn generate_setup_token(&self) -> Result<String> {
        generate_setup_token(self.layout.setup_token())
    }

    /// Reads the setup token, stripped of surrounding whitespace.
    pub fn load_setup_token(&self) -> Result<String> {
        load_setup_token(self.layout.setup_token())
    }

    /// Which of the managed files exist, key files first.
    pub fn status(&self) -> Vec<FileStatus> {
        self.layout
            .pem_files()
            .into_iter()
            .chain(std::iter::once(self.layout.setup_token()))
            .map(|path| FileStatus {
                path: path.to_path_buf(),
                present: path.exists(),
            })
            .collect()
    }

    fn generate_pair(&self, role: KeyRole) -> Result<GeneratedPair> {
        let generation = |source: anyhow::Error| KeyStoreError::KeyGeneration {
            role,
            source: source.into(),
        };

        debug!(%role, bits = self.key_bits, "generating key pair");
        let private_pem = self
            .provider
            .generate_private_key(self.key_bits)
            .map_err(generation)?;
        let public_pem = self
            .provider
            .derive_public_key(&private_pem)
            .map_err(generation)?;

        Ok(GeneratedPair {
            public_pem,
            private_pem,
        })
    }

    fn write_pair(&self, role: KeyRole, pair: &GeneratedPair) -> Result<()> {
        let paths = self.layout.pem_paths(role);
        let generation = |source: anyhow::Error| KeyStoreError::KeyGeneration {
            role,
            source: source.into(),
        };

        Storage::secret(&paths.private)
            .save(pair.private_pem.as_bytes())
            .map_err(generation)?;
        Storage::public(&paths.public)
            .save(pair.public_pem.as_bytes())
            .map_err(generation)?;
        Ok(())
    }
}

/// Reads and validates the key pair stored at `paths`.
///
/// The public PEM is converted to a JWK tagged with `role`; the private PEM
/// must belong to it.
pub fn load_key_pair<P: CryptoProvider>(
    provider: &P,
    role: KeyRole,
    paths: &PemPaths,
) -> Result<KeyPair> {
    let public_pem = read_pem(KeyKind::Public, &paths.public)?;
    let private_pem = Zeroizing::new(read_pem(KeyKind::Private, &paths.private)?);

    let params = provider
        .pem_to_jwk(&public_pem)
        .map_err(|e| KeyStoreError::KeyFormat {
            kind: KeyKind::Public,
            path: paths.public.clone(),
            source: e.into(),
        })?;

    provider
        .check_key_pair(&private_pem, &params)
        .map_err(|e| KeyStoreError::KeyFormat {
            kind: KeyKind::Private,
            path: paths.private.clone(),
            source: e.into(),
        })?;

    debug!(%role, public = %paths.public.display(), "loaded key pair");

    Ok(KeyPair {
        role,
        public_pem,
        private_pem,
        public_jwk: Jwk::new(role, params),
    })
}

/// Writes a fresh setup token to `path`, replacing any existing one.
pub fn generate_setup_token(path: &Path) -> Result<String> {
    let token_write = |source: BoxError| KeyStoreError::TokenWrite {
        path: path.to_path_buf(),
        source,
    };

    let token = crypto::generate_token().map_err(|e| token_write(e.into()))?;
    Storage::secret(path)
        .save(token.as_bytes())
        .map_err(|e| token_write(e.into()))?;

    info!(path = %path.display(), "generated setup token");
    Ok(token)
}

/// Reads the setup token at `path`, stripped of surrounding whitespace.
pub fn load_setup_token(path: &Path) -> Result<String> {
    let raw = Storage::secret(path)
        .load_string()
        .map_err(|source| KeyStoreError::TokenRead {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(raw.trim().to_string())
}

/// Reads a PEM file as text. Undecodable bytes are kept lossily so that
/// garbage content surfaces as a format error, not a read error.
fn read_pem(kind: KeyKind, path: &Path) -> Result<String> {
    let bytes = Zeroizing::new(Storage::public(path).load().map_err(|source| {
        KeyStoreError::KeyRead {
            kind,
            path: path.to_path_buf(),
            source,
        }
    })?);

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
