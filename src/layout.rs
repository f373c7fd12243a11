//! On-disk layout of the key directory.

use std::fmt;
use std::path::{Path, PathBuf};

pub const KEYS_DIR: &str = "keys";
pub const SIG_PUBLIC_FILE: &str = "sig.rsa.pub.pem";
pub const SIG_PRIVATE_FILE: &str = "sig.rsa.prv.pem";
pub const ENC_PUBLIC_FILE: &str = "enc.rsa.pub.pem";
pub const ENC_PRIVATE_FILE: &str = "enc.rsa.prv.pem";
pub const SETUP_TOKEN_FILE: &str = "setup.token";

/// Functional purpose of a key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    Signature,
    Encryption,
}

impl KeyRole {
    /// Generation and publication order: signature first.
    pub const ALL: [KeyRole; 2] = [KeyRole::Signature, KeyRole::Encryption];
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Signature => write!(f, "signature"),
            KeyRole::Encryption => write!(f, "encryption"),
        }
    }
}

/// Which half of a key pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Public,
    Private,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Public => write!(f, "public"),
            KeyKind::Private => write!(f, "private"),
        }
    }
}

/// Paths of the two PEM files making up one key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemPaths {
    pub public: PathBuf,
    pub private: PathBuf,
}

/// All file paths derived from a base directory.
///
/// Building a layout is pure path arithmetic; nothing on disk is inspected
/// or created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    directory: PathBuf,
    sig: PemPaths,
    enc: PemPaths,
    setup_token: PathBuf,
}

impl Layout {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let directory = base.as_ref().join(KEYS_DIR);

        let sig = PemPaths {
            public: directory.join(SIG_PUBLIC_FILE),
            private: directory.join(SIG_PRIVATE_FILE),
        };
        let enc = PemPaths {
            public: directory.join(ENC_PUBLIC_FILE),
            private: directory.join(ENC_PRIVATE_FILE),
        };
        let setup_token = directory.join(SETUP_TOKEN_FILE);

        Self {
            directory,
            sig,
            enc,
            setup_token,
        }
    }

    /// The `keys` directory holding all material.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn pem_paths(&self, role: KeyRole) -> &PemPaths {
        match role {
            KeyRole::Signature => &self.sig,
            KeyRole::Encryption => &self.enc,
        }
    }

    pub fn setup_token(&self) -> &Path {
        &self.setup_token
    }

    /// The four PEM paths in generation order.
    pub fn pem_files(&self) -> [&Path; 4] {
        [
            &self.sig.public,
            &self.sig.private,
            &self.enc.public,
            &self.enc.private,
        ]
    }
}
