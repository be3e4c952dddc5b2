//! Agent command - resolve the agent configuration and report it
//!
//! Kernel capture lives outside this workspace; the agent binary resolves the
//! layered configuration (file or ad-hoc flags), logs a summary per
//! tracepoint and prints the effective configuration as TOML, ready to be
//! saved and passed back with `--config`.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use tcptrail_config::{Config, HasDiagnostics};

/// Render the effective configuration as TOML
pub fn render(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("failed to render agent configuration")
}

/// Log the resolved tracepoints and write the effective configuration to `out`
pub fn run<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    config.diagnostics().in_scope(|| {
        for tracepoint in &config.tracepoints {
            let fields = config.tracepoint_fields(&tracepoint.fields);
            info!(
                tracepoint = %tracepoint.name,
                fields = ?fields,
                tcp_state = %tracepoint.tcp_state,
                sample = tracepoint.sample,
                inet = ?tracepoint.inet,
                egress = %tracepoint.egress,
                workers = tracepoint.workers,
                "tracepoint configured"
            );
        }
        info!(
            version = env!("CARGO_PKG_VERSION"),
            tracepoints = config.tracepoints.len(),
            egress = config.egress.len(),
            "agent configuration resolved"
        );
    });

    let rendered = render(config)?;
    out.write_all(rendered.as_bytes())
        .context("failed to write agent configuration")?;
    out.flush().context("failed to write agent configuration")?;
    Ok(())
}
