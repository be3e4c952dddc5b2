//! tcptrail-server - consume, decode and route TCP telemetry

use anyhow::{Context, Result};
use tcptrail::Server;
use tcptrail_config::{ConfigError, HasDiagnostics, get_server};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match get_server(std::env::args_os(), env!("CARGO_PKG_VERSION")) {
        Ok(config) => config,
        // --help, --version and usage errors print and exit with clap's status
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e).context("failed to resolve server configuration"),
    };

    config
        .diagnostics()
        .install_global()
        .context("failed to install diagnostics")?;

    Server::new(config).run().await
}
