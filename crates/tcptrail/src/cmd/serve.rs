//! Serve command - run the tcptrail server
//!
//! Starts every configured flow, writes each ingestion queue as JSON lines and
//! runs until a shutdown signal arrives.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::AsyncWrite;
use tokio::signal;
use tracing::{error, info, warn};

use tcptrail_config::{RunContext, ServerConfig};
use tcptrail_pipeline::FlowRouter;
use tcptrail_sources::IngressRegistry;

use crate::ingestion::{check_ingestions, write_json_lines};

/// A resolved server, ready to run
pub struct Server {
    ctx: RunContext<ServerConfig>,
    registry: Arc<IngressRegistry>,
}

impl Server {
    /// Server over the session factories compiled into this build
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, IngressRegistry::new())
    }

    /// Server over an explicit set of session factories
    pub fn with_registry(config: ServerConfig, registry: IngressRegistry) -> Self {
        Self {
            ctx: RunContext::new(config),
            registry: Arc::new(registry),
        }
    }

    /// Session factories by ingress type
    pub fn registry(&self) -> &IngressRegistry {
        &self.registry
    }

    /// Context shared with every component of this server
    pub fn context(&self) -> &RunContext<ServerConfig> {
        &self.ctx
    }

    /// Run until Ctrl+C or SIGTERM, writing every ingestion to stdout
    pub async fn run(self) -> Result<()> {
        self.run_until(wait_for_shutdown(), |_| tokio::io::stdout()).await
    }

    /// Run until `shutdown` resolves or the context is cancelled
    ///
    /// `output` is called once per referenced ingestion to obtain its writer.
    pub async fn run_until<S, W, F>(self, shutdown: S, mut output: F) -> Result<()>
    where
        S: Future<Output = ()>,
        W: AsyncWrite + Unpin + Send + 'static,
        F: FnMut(&str) -> W,
    {
        let config = Arc::clone(self.ctx.config());
        let logger = self.ctx.logger().clone();

        logger.in_scope(|| {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                platform = std::env::consts::OS,
                arch = std::env::consts::ARCH,
                ingress = config.ingress.len(),
                flows = config.flow.len(),
                "tcptrail-server starting"
            );
        });

        check_ingestions(&config)?;

        let router = FlowRouter::new(self.registry);
        let mut flows = router
            .start(&self.ctx)
            .await
            .context("failed to start flows")?;

        let mut writers = Vec::new();
        for name in config.referenced_ingestions() {
            let Some(rx) = flows.take_output(name) else {
                continue;
            };
            let writer = output(name);
            let name = name.to_string();

            writers.push(tokio::spawn(logger.attach(async move {
                match write_json_lines(&name, rx, writer).await {
                    Ok(lines) => info!(ingestion = %name, lines, "ingestion drained"),
                    Err(e) => error!(ingestion = %name, error = %e, "ingestion failed"),
                }
            })));
        }

        tokio::select! {
            () = shutdown => {
                logger.in_scope(|| info!("shutdown signal received, stopping flows"));
            }
            () = self.ctx.cancel_token().cancelled() => {}
        }

        self.ctx.cancel();
        logger.attach(flows.shutdown()).await;

        for writer in writers {
            if let Err(e) = writer.await {
                logger.in_scope(|| warn!(error = %e, "ingestion task panicked during shutdown"));
            }
        }

        logger.in_scope(|| info!("tcptrail-server shutdown complete"));
        Ok(())
    }
}

/// Wait for Ctrl+C or, on unix, SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::time::Duration;

    use tcptrail_sources::MemoryBroker;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    use super::*;

    const CONFIG: &str = r#"
[ingress.mem]
type = "memory"

[ingestion.console]
type = "stdout"

[[flow]]
ingress = "mem"
ingestion = "console"
serialization = "json"
"#;

    fn server(toml: &str) -> (Server, MemoryBroker, tcptrail_config::MemorySink) {
        let mut config = ServerConfig::from_str(toml).unwrap();
        let sink = config.attach_memory_sink();
        let broker = MemoryBroker::new();
        let mut registry = IngressRegistry::empty();
        registry.register(broker.factory());
        (Server::with_registry(config, registry), broker, sink)
    }

    #[cfg(feature = "kafka")]
    #[test]
    fn test_default_server_serves_kafka() {
        let server = Server::new(ServerConfig::default());
        assert!(server.registry().contains(tcptrail_sources::KAFKA_KIND));
    }

    #[tokio::test]
    async fn test_serve_writes_json_lines() {
        let (server, broker, sink) = server(CONFIG);
        let (writer, reader) = tokio::io::duplex(4096);
        let mut writer = Some(writer);
        let (stop, stopped) = oneshot::channel::<()>();

        broker.publish(&br#"{"SAddr":"10.0.0.1","RTT":15}"#[..]);

        let task = tokio::spawn(server.run_until(
            async move {
                let _ = stopped.await;
            },
            move |_| writer.take().unwrap(),
        ));

        let mut lines = BufReader::new(reader).lines();
        let line = timeout(Duration::from_secs(2), lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["SAddr"], "10.0.0.1");
        assert_eq!(value["RTT"], 15);

        stop.send(()).unwrap();
        timeout(Duration::from_secs(2), task)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();

        // the writer is dropped once every flow has stopped
        assert_eq!(lines.next_line().await.unwrap(), None);
        assert!(sink.contains("tcptrail-server shutdown complete"));
        assert_eq!(broker.closes(), 1);
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancellation() {
        let (server, _broker, _sink) = server(CONFIG);
        let ctx = server.context().clone();

        let task = tokio::spawn(server.run_until(std::future::pending(), |_| tokio::io::sink()));
        ctx.cancel();

        timeout(Duration::from_secs(2), task)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_serve_rejects_unsupported_ingestion() {
        let (server, broker, _sink) = server(
            r#"
[ingress.mem]
type = "memory"

[ingestion.es]
type = "elasticsearch"

[[flow]]
ingress = "mem"
ingestion = "es"
serialization = "json"
"#,
        );

        let err = server
            .run_until(std::future::pending(), |_| tokio::io::sink())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported type 'elasticsearch'"));
        assert_eq!(broker.opens(), 0);
    }

    #[tokio::test]
    async fn test_serve_reports_flow_errors() {
        let (server, _broker, _sink) = server(
            r#"
[ingress.mem]
type = "memory"

[ingestion.console]
type = "stdout"

[[flow]]
ingress = "mem"
ingestion = "console"
serialization = "xml"
"#,
        );

        let err = server
            .run_until(std::future::pending(), |_| tokio::io::sink())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to start flows");
        assert!(format!("{err:#}").contains("unknown serialization format 'xml'"));
    }
}
