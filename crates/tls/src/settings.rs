//! Loaded TLS settings

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::material::{TlsMaterial, read_certs, read_key};
use crate::{CredentialError, Result};

/// Certificate chain plus its private key
pub struct Identity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl Identity {
    /// Certificate chain, leaf first
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    /// Private key
    pub fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("certificates", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Material read from disk, ready to build transport configs from
#[derive(Clone)]
pub struct TlsSettings {
    identity: Option<Identity>,
    roots: Arc<RootCertStore>,
}

impl TlsSettings {
    /// Identity presented to peers, if configured
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Trust anchors used to verify peers (possibly empty)
    pub fn roots(&self) -> &Arc<RootCertStore> {
        &self.roots
    }

    /// Whether any trust anchor was loaded
    pub fn has_trust_anchors(&self) -> bool {
        !self.roots.is_empty()
    }
}

impl fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("identity", &self.identity)
            .field("trust_anchors", &self.roots.len())
            .finish()
    }
}

/// Load the material named by `material`
///
/// Returns `Ok(None)` when TLS is disabled. The certificate and key must be
/// given together; the CA bundle is optional.
///
/// # Errors
///
/// Fails on unreadable or empty files, a half certificate/key pair, or trust
/// anchors rustls cannot parse.
pub fn build_tls_settings(material: &TlsMaterial) -> Result<Option<TlsSettings>> {
    if !material.enable {
        return Ok(None);
    }

    let identity = match (&material.cert_file, &material.key_file) {
        (Some(cert), Some(key)) => Some(Identity {
            chain: read_certs("certificate", cert)?,
            key: read_key(key)?,
        }),
        (Some(_), None) => {
            return Err(CredentialError::HalfPair {
                present: "cert_file",
                missing: "key_file",
            });
        }
        (None, Some(_)) => {
            return Err(CredentialError::HalfPair {
                present: "key_file",
                missing: "cert_file",
            });
        }
        (None, None) => None,
    };

    let roots = match &material.ca_file {
        Some(path) => load_roots(path)?,
        None => RootCertStore::empty(),
    };

    tracing::debug!(
        identity = identity.is_some(),
        trust_anchors = roots.len(),
        "loaded tls material"
    );

    Ok(Some(TlsSettings {
        identity,
        roots: Arc::new(roots),
    }))
}

fn load_roots(path: &Path) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    for cert in read_certs("ca", path)? {
        roots
            .add(cert)
            .map_err(|source| CredentialError::InvalidAnchor {
                path: path.to_path_buf(),
                source,
            })?;
    }
    Ok(roots)
}
