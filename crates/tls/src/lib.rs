//! tcptrail TLS - transport credentials from PEM files
//!
//! One loader serves both directions:
//! - [`build_tls_settings`] reads the certificate chain, private key and trust
//!   anchors named by a [`TlsMaterial`] block
//! - [`build_transport_credentials`] turns them into rustls server and client
//!   configurations for inbound ([`TransportCredentials::acceptor`]) and
//!   outbound ([`TransportCredentials::connector`]) connections
//!
//! Adapters that hand file paths to a foreign TLS stack (librdkafka) still call
//! [`build_tls_settings`] first so broken material is rejected at startup.
//!
//! # Example
//!
//! ```toml
//! [ingress.kafka.config.tls]
//! enable = true
//! cert_file = "client.pem"
//! key_file = "client.key"
//! ca_file = "ca.pem"
//! ```

mod credentials;
mod error;
mod material;
mod settings;

pub use credentials::{TransportCredentials, build_transport_credentials};
pub use error::CredentialError;
pub use material::TlsMaterial;
pub use settings::{Identity, TlsSettings, build_tls_settings};

/// Result type for credential operations
pub type Result<T> = std::result::Result<T, CredentialError>;

#[cfg(test)]
mod test_util;
