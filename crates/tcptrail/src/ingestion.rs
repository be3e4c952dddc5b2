//! Built-in ingestion: one JSON line per record
//!
//! The server ships a single ingestion type. Any other type declared by a
//! flow fails at startup, before a consumer is started.

use anyhow::{Result, bail};
use crossfire::MAsyncRx;
use tcptrail_config::ServerConfig;
use tcptrail_protocol::Record;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Type tag of the JSON-lines ingestion
pub const STDOUT_KIND: &str = "stdout";

/// Fail if a flow feeds an ingestion this binary cannot write
pub fn check_ingestions(config: &ServerConfig) -> Result<()> {
    for name in config.referenced_ingestions() {
        let kind = config
            .ingestion
            .get(name)
            .map(|spec| spec.kind.as_str())
            .unwrap_or_default();

        if kind != STDOUT_KIND {
            bail!("ingestion '{name}' has unsupported type '{kind}' (supported: {STDOUT_KIND})");
        }
    }
    Ok(())
}

/// Write records as JSON lines until every sender of the queue is gone
///
/// Returns the number of lines written.
pub async fn write_json_lines<W>(ingestion: &str, rx: MAsyncRx<Record>, mut out: W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;

    while let Ok(record) = rx.recv().await {
        let mut line = match record.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(ingestion, error = %e, "dropping unrenderable record");
                continue;
            }
        };
        line.push('\n');

        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
        written += 1;
    }

    Ok(written)
}
