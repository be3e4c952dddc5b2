//! TLS material declaration and PEM readers

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::{Deserialize, Serialize};

use crate::{CredentialError, Result};

/// File locations of the TLS material for one endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsMaterial {
    /// Use TLS at all
    pub enable: bool,

    /// PEM certificate chain presented by this side
    pub cert_file: Option<PathBuf>,

    /// PEM private key matching `cert_file`
    pub key_file: Option<PathBuf>,

    /// PEM bundle of trust anchors used to verify the peer
    pub ca_file: Option<PathBuf>,
}

impl TlsMaterial {
    /// Enabled material with an identity and trust anchors
    pub fn new(
        cert_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
        ca_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            enable: true,
            cert_file: Some(cert_file.into()),
            key_file: Some(key_file.into()),
            ca_file: Some(ca_file.into()),
        }
    }
}

fn open(kind: &'static str, path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| CredentialError::read(kind, path, e))
}

/// Read every certificate in a PEM file
pub(crate) fn read_certs(kind: &'static str, path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = open(kind, path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| CredentialError::read(kind, path, e))?;

    if certs.is_empty() {
        return Err(CredentialError::empty(kind, path));
    }
    Ok(certs)
}

/// Read the first private key in a PEM file (PKCS#8, PKCS#1 or SEC1)
pub(crate) fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = open("key", path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| CredentialError::read("key", path, e))?
        .ok_or_else(|| CredentialError::empty("key", path))
}
