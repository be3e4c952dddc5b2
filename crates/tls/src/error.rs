//! Credential error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading TLS material or building transport configs
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A PEM file could not be read
    #[error("failed to read {kind} file '{}': {source}", path.display())]
    Read {
        /// What the file should contain ("certificate", "key", "ca")
        kind: &'static str,
        /// Path to the file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// A PEM file held no usable entry of the expected kind
    #[error("no {kind} found in '{}'", path.display())]
    Empty {
        /// What the file should contain
        kind: &'static str,
        /// Path to the file
        path: PathBuf,
    },

    /// Only one of certificate and key was configured
    #[error("{present} is set but {missing} is not; both or neither are required")]
    HalfPair {
        /// The configured half
        present: &'static str,
        /// The missing half
        missing: &'static str,
    },

    /// A trust anchor could not be added to the root store
    #[error("invalid trust anchor in '{}': {source}", path.display())]
    InvalidAnchor {
        /// Path to the CA bundle
        path: PathBuf,
        /// Underlying rustls error
        #[source]
        source: rustls::Error,
    },

    /// Inbound transport needs a certificate and key
    #[error("accepting TLS connections requires cert_file and key_file")]
    NoIdentity,

    /// rustls refused the configuration (bad key, unsupported algorithm, ...)
    #[error("tls configuration rejected: {0}")]
    Tls(#[from] rustls::Error),

    /// Client certificate verifier could not be built
    #[error("client verifier rejected: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

impl CredentialError {
    /// Create a Read error
    pub fn read(kind: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            kind,
            path: path.into(),
            source,
        }
    }

    /// Create an Empty error
    pub fn empty(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::Empty {
            kind,
            path: path.into(),
        }
    }
}
