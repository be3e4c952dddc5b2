//! rustls server and client configurations
//!
//! Both directions come from the same [`TlsSettings`]. The server side requires
//! an identity and verifies client certificates whenever trust anchors are
//! loaded. The client side trusts the loaded anchors and presents the identity
//! when there is one.

use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, ServerConfig};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::material::TlsMaterial;
use crate::settings::{TlsSettings, build_tls_settings};
use crate::{CredentialError, Result};

/// Ready-to-use transport configurations
#[derive(Debug, Clone)]
pub struct TransportCredentials {
    server: Option<Arc<ServerConfig>>,
    client: Arc<ClientConfig>,
    mutual: bool,
}

impl TransportCredentials {
    /// Build both configurations from loaded settings
    pub fn from_settings(settings: &TlsSettings) -> Result<Self> {
        let provider = provider();

        let server = match settings.identity() {
            Some(identity) => {
                let builder = ServerConfig::builder_with_provider(provider.clone())
                    .with_safe_default_protocol_versions()?;
                let builder = if settings.has_trust_anchors() {
                    let verifier = WebPkiClientVerifier::builder_with_provider(
                        settings.roots().clone(),
                        provider.clone(),
                    )
                    .build()?;
                    builder.with_client_cert_verifier(verifier)
                } else {
                    builder.with_no_client_auth()
                };
                let config =
                    builder.with_single_cert(identity.chain().to_vec(), identity.key().clone_key())?;
                Some(Arc::new(config))
            }
            None => None,
        };

        let builder = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(settings.roots().clone());
        let client = match settings.identity() {
            Some(identity) => builder
                .with_client_auth_cert(identity.chain().to_vec(), identity.key().clone_key())?,
            None => builder.with_no_client_auth(),
        };

        Ok(Self {
            server,
            client: Arc::new(client),
            mutual: settings.has_trust_anchors(),
        })
    }

    /// Acceptor for inbound connections
    ///
    /// # Errors
    ///
    /// `CredentialError::NoIdentity` when no certificate/key pair was loaded.
    pub fn acceptor(&self) -> Result<TlsAcceptor> {
        self.server
            .clone()
            .map(TlsAcceptor::from)
            .ok_or(CredentialError::NoIdentity)
    }

    /// Connector for outbound connections
    pub fn connector(&self) -> TlsConnector {
        TlsConnector::from(self.client.clone())
    }

    /// rustls server configuration, when an identity exists
    pub fn server_config(&self) -> Option<&Arc<ServerConfig>> {
        self.server.as_ref()
    }

    /// rustls client configuration
    pub fn client_config(&self) -> &Arc<ClientConfig> {
        &self.client
    }

    /// Whether inbound connections must present a client certificate
    pub fn requires_client_auth(&self) -> bool {
        self.mutual && self.server.is_some()
    }
}

/// Load material and build transport configurations in one step
///
/// Returns `Ok(None)` when TLS is disabled.
pub fn build_transport_credentials(material: &TlsMaterial) -> Result<Option<TransportCredentials>> {
    build_tls_settings(material)?
        .map(|settings| TransportCredentials::from_settings(&settings))
        .transpose()
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}
