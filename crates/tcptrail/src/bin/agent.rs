//! tcptrail-agent - resolve and report the agent configuration

use anyhow::{Context, Result};
use tcptrail_config::{ConfigError, HasDiagnostics, get};

fn main() -> Result<()> {
    let config = match get(std::env::args_os(), env!("CARGO_PKG_VERSION")) {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e).context("failed to resolve agent configuration"),
    };

    config
        .diagnostics()
        .install_global()
        .context("failed to install diagnostics")?;

    tcptrail::cmd::agent::run(&config, &mut std::io::stdout().lock())
}
