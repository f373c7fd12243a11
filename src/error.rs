use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::layout::{KeyKind, KeyRole};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a key store operation can fail.
///
/// All variants are fatal to the operation that produced them; nothing is
/// retried and no partial result is returned.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error(
        "failed to generate the {role} key pair; please ensure a compatible RSA \
         cryptography backend is available and the key directory is writable"
    )]
    KeyGeneration {
        role: KeyRole,
        #[source]
        source: BoxError,
    },

    #[error("unable to read the {kind} key from {}", path.display())]
    KeyRead {
        kind: KeyKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the {kind} key {} is not a valid RSA key", path.display())]
    KeyFormat {
        kind: KeyKind,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("key file {} already exists", path.display())]
    KeyExists { path: PathBuf },

    #[error("unable to save setup token to {}", path.display())]
    TokenWrite {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("unable to read setup token from {}", path.display())]
    TokenRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl KeyStoreError {
    /// The file the error refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            KeyStoreError::KeyGeneration { .. } => None,
            KeyStoreError::KeyRead { path, .. }
            | KeyStoreError::KeyFormat { path, .. }
            | KeyStoreError::KeyExists { path }
            | KeyStoreError::TokenWrite { path, .. }
            | KeyStoreError::TokenRead { path, .. } => Some(path),
        }
    }
}
