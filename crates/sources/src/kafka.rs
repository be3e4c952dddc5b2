//! Kafka ingress (librdkafka)
//!
//! Offsets are committed by the client in the background, but only offsets
//! that were explicitly stored. Storing an offset is the mark: it happens on
//! hand-off or after forwarding depending on the ingress ack policy.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::client::ClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, ConsumerContext, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use tcptrail_tls::build_tls_settings;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::handoff::{Ack, Commit, Handoff};
use crate::session::{ConsumerSession, ErrorSender, SessionFactory};
use crate::settings::IngressSettings;

/// Type tag of the Kafka ingress
pub const KAFKA_KIND: &str = "kafka";

/// Client context forwarding librdkafka's background errors
struct ForwardingContext {
    errors: ErrorSender,
}

impl ClientContext for ForwardingContext {
    fn error(&self, error: KafkaError, reason: &str) {
        let _ = self
            .errors
            .send(SessionError::transport(format!("{error} ({reason})")));
    }
}

impl ConsumerContext for ForwardingContext {}

type KafkaConsumer = StreamConsumer<ForwardingContext>;

/// Opens consumer-group sessions on a Kafka cluster
#[derive(Debug, Default, Clone, Copy)]
pub struct KafkaSessionFactory;

#[async_trait]
impl SessionFactory for KafkaSessionFactory {
    fn kind(&self) -> &'static str {
        KAFKA_KIND
    }

    async fn open(
        &self,
        settings: &IngressSettings,
        errors: ErrorSender,
    ) -> Result<Box<dyn ConsumerSession>, SessionError> {
        if settings.brokers.is_empty() {
            return Err(SessionError::setup("no brokers configured"));
        }

        let client = client_config(settings)?;
        let consumer: KafkaConsumer = client.create_with_context(ForwardingContext { errors })?;
        consumer.subscribe(&[settings.topic.as_str()])?;

        tracing::info!(
            brokers = %settings.brokers.join(","),
            topic = %settings.topic,
            group = %settings.group_id,
            "kafka session opened"
        );

        let consumer = Arc::new(consumer);
        Ok(Box::new(KafkaSession {
            commit: store_offsets(Arc::clone(&consumer), settings.topic.clone()),
            consumer,
        }))
    }
}

fn client_config(settings: &IngressSettings) -> Result<ClientConfig, SessionError> {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", settings.brokers.join(","))
        .set("group.id", &settings.group_id)
        .set("enable.auto.commit", "true")
        .set("enable.auto.offset.store", "false")
        .set("auto.offset.reset", "latest");

    let tls = build_tls_settings(&settings.tls)?.is_some();
    if tls {
        if let Some(ca) = &settings.tls.ca_file {
            client.set("ssl.ca.location", ca.display().to_string());
        }
        if let Some(cert) = &settings.tls.cert_file {
            client.set("ssl.certificate.location", cert.display().to_string());
        }
        if let Some(key) = &settings.tls.key_file {
            client.set("ssl.key.location", key.display().to_string());
        }
    }

    let protocol = match (&settings.sasl, tls) {
        (Some(sasl), tls) => {
            client
                .set("sasl.mechanisms", &sasl.mechanism)
                .set("sasl.username", &sasl.username)
                .set("sasl.password", &sasl.password);
            if tls { "sasl_ssl" } else { "sasl_plaintext" }
        }
        (None, true) => "ssl",
        (None, false) => "plaintext",
    };
    client.set("security.protocol", protocol);

    for (key, value) in &settings.properties {
        client.set(key, value);
    }
    Ok(client)
}

/// Commit that stores the position for the background auto-commit
fn store_offsets(consumer: Arc<KafkaConsumer>, topic: String) -> Commit {
    Arc::new(move |partition, offset| {
        // the stored offset is the next one to read
        if let Err(e) = consumer.store_offset(&topic, partition, offset + 1) {
            tracing::warn!(topic = %topic, partition, offset, error = %e, "failed to store offset");
        }
    })
}

struct KafkaSession {
    consumer: Arc<KafkaConsumer>,
    commit: Commit,
}

#[async_trait]
impl ConsumerSession for KafkaSession {
    async fn consume(&mut self, handoff: &Handoff, cancel: &CancellationToken) -> Result<(), SessionError> {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                received = self.consumer.recv() => received,
            };

            let (payload, partition, offset) = {
                let message = received?;
                (
                    Bytes::copy_from_slice(message.payload().unwrap_or_default()),
                    message.partition(),
                    message.offset(),
                )
            };

            let ack = Ack::new(partition, offset, Arc::clone(&self.commit));

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                delivered = handoff.deliver(payload, ack) => delivered?,
            }
        }
    }

    async fn close(&mut self) {
        self.consumer.unsubscribe();
        tracing::info!("kafka session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SaslSettings;

    #[test]
    fn test_client_config_plaintext() {
        let settings = IngressSettings {
            brokers: vec!["a:9092".into(), "b:9092".into()],
            ..Default::default()
        };
        let client = client_config(&settings).unwrap();

        assert_eq!(client.get("bootstrap.servers"), Some("a:9092,b:9092"));
        assert_eq!(client.get("enable.auto.offset.store"), Some("false"));
        assert_eq!(client.get("security.protocol"), Some("plaintext"));
    }

    #[test]
    fn test_client_config_sasl_and_properties() {
        let mut settings = IngressSettings {
            brokers: vec!["a:9092".into()],
            sasl: Some(SaslSettings {
                mechanism: "PLAIN".into(),
                username: "u".into(),
                password: "p".into(),
            }),
            ..Default::default()
        };
        settings
            .properties
            .insert("fetch.min.bytes".into(), "1024".into());

        let client = client_config(&settings).unwrap();
        assert_eq!(client.get("security.protocol"), Some("sasl_plaintext"));
        assert_eq!(client.get("sasl.username"), Some("u"));
        assert_eq!(client.get("fetch.min.bytes"), Some("1024"));
    }

    #[test]
    fn test_client_config_rejects_missing_ca() {
        let mut settings = IngressSettings::default();
        settings.tls.enable = true;
        settings.tls.ca_file = Some("does-not-exist.pem".into());

        assert!(matches!(
            client_config(&settings),
            Err(SessionError::Credentials(_))
        ));
    }
}
