//! Diagnostics sink attached to a resolved configuration
//!
//! Components log with the ordinary `tracing` macros. Which sink receives those
//! events is decided by the [`Diagnostics`] carried in the configuration: tasks
//! spawned by a component run under it via [`Diagnostics::attach`].
//!
//! The sink itself is a [`MakeWriter`] capability. Production builds one from
//! [`LogConfig`]; tests inject a [`MemorySink`] and query what was written.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::Dispatch;
use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::logging::{LogConfig, LogFormat, LogLevel, LogOutput};

/// Handle to the diagnostic sink of a configuration
///
/// Cheap to clone; all clones feed the same sink.
#[derive(Clone)]
pub struct Diagnostics {
    dispatch: Dispatch,
    sink: &'static str,
}

impl Diagnostics {
    /// Build diagnostics over an arbitrary writer capability
    pub fn new<W>(writer: W, level: LogLevel, format: LogFormat, ansi: bool) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            dispatch: build_dispatch(writer, level, format, ansi),
            sink: "custom",
        }
    }

    /// Build the production sink described by a `[log]` section
    ///
    /// # Errors
    ///
    /// Returns an error if the configured log file cannot be opened for append.
    pub fn from_config(config: &LogConfig) -> io::Result<Self> {
        let diagnostics = match &config.output {
            LogOutput::Stdout => Self {
                dispatch: build_dispatch(io::stdout, config.level, config.format, true),
                sink: "stdout",
            },
            LogOutput::Stderr => Self {
                dispatch: build_dispatch(io::stderr, config.level, config.format, true),
                sink: "stderr",
            },
            LogOutput::File(path) => {
                let file: File = OpenOptions::new().create(true).append(true).open(path)?;
                Self {
                    dispatch: build_dispatch(Arc::new(file), config.level, config.format, false),
                    sink: "file",
                }
            }
        };
        Ok(diagnostics)
    }

    /// Build a buffering sink for tests
    ///
    /// Everything down to `trace` is captured as JSON lines.
    pub fn memory() -> (Self, MemorySink) {
        let sink = MemorySink::new();
        let diagnostics = Self {
            dispatch: build_dispatch(sink.clone(), LogLevel::Trace, LogFormat::Json, false),
            sink: "memory",
        };
        (diagnostics, sink)
    }

    /// Underlying tracing dispatcher
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Kind of sink ("stdout", "stderr", "file", "memory", "custom")
    pub fn sink_kind(&self) -> &'static str {
        self.sink
    }

    /// Run a future with this sink as its default subscriber
    pub fn attach<F: Future>(&self, future: F) -> WithDispatch<F> {
        future.with_subscriber(self.dispatch.clone())
    }

    /// Run a closure with this sink as the default subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this sink the process-wide default
    pub fn install_global(&self) -> Result<(), tracing::dispatcher::SetGlobalDefaultError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").field("sink", &self.sink).finish()
    }
}

/// Lazily defaulted diagnostics slot carried by configuration types
#[derive(Clone, Default)]
pub(crate) struct DiagnosticsSlot(OnceLock<Diagnostics>);

impl DiagnosticsSlot {
    /// Install the sink described by `log` unless one is already attached
    pub(crate) fn ensure(&self, log: &LogConfig) -> io::Result<()> {
        if self.0.get().is_none() {
            let diagnostics = Diagnostics::from_config(log)?;
            // a concurrent initializer may have won; either sink is valid
            let _ = self.0.set(diagnostics);
        }
        Ok(())
    }

    /// Attached sink, falling back to stderr if `log` cannot be honoured
    pub(crate) fn get_or_default(&self, log: &LogConfig) -> &Diagnostics {
        self.0.get_or_init(|| {
            Diagnostics::from_config(log).unwrap_or_else(|_| Self::stderr(log))
        })
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.get().is_some()
    }

    pub(crate) fn replace(&mut self, diagnostics: Diagnostics) {
        self.0 = OnceLock::from(diagnostics);
    }

    fn stderr(log: &LogConfig) -> Diagnostics {
        Diagnostics {
            dispatch: build_dispatch(io::stderr, log.level, log.format, true),
            sink: "stderr",
        }
    }
}

impl fmt::Debug for DiagnosticsSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(diagnostics) => diagnostics.fmt(f),
            None => f.write_str("Diagnostics(unset)"),
        }
    }
}

fn build_dispatch<W>(writer: W, level: LogLevel, format: LogFormat, ansi: bool) -> Dispatch
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::new(level.as_str());
    let registry = Registry::default().with(filter);

    match format {
        LogFormat::Console => Dispatch::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true),
            ),
        ),
        LogFormat::Json => Dispatch::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true),
            ),
        ),
    }
}

#[derive(Default)]
struct MemoryBuffer {
    bytes: Mutex<Vec<u8>>,
    closed: AtomicBool,
}

/// Diagnostic sink that keeps every entry in memory
///
/// Entries are JSON lines. Once closed, further writes are discarded.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<MemoryBuffer>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any captured entry contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        String::from_utf8_lossy(&self.buffer.bytes.lock()).contains(needle)
    }

    /// Captured entries, one per line
    pub fn entries(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.bytes.lock())
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Captured entries parsed as JSON objects; lines that fail to parse are skipped
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.entries()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Number of captured entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing has been captured
    pub fn is_empty(&self) -> bool {
        self.buffer.bytes.lock().is_empty()
    }

    /// Drop all captured entries
    pub fn clear(&self) {
        self.buffer.bytes.lock().clear();
    }

    /// Flush hook; entries are visible as soon as they are written
    pub fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Close hook; later writes are discarded
    pub fn close(&self) -> io::Result<()> {
        self.buffer.closed.store(true, Ordering::Release);
        Ok(())
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.buffer.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("bytes", &self.buffer.bytes.lock().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Writer handed out by [`MemorySink`] for each event
pub struct MemoryWriter {
    buffer: Arc<MemoryBuffer>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.buffer.closed.load(Ordering::Acquire) {
            self.buffer.bytes.lock().extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MemorySink {
    type Writer = MemoryWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MemoryWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_events() {
        let (diagnostics, sink) = Diagnostics::memory();

        diagnostics.in_scope(|| {
            tracing::info!(ingress = "kafka", "session ready");
            tracing::debug!("decoder resolved");
        });

        assert!(sink.contains("session ready"));
        assert!(sink.contains("decoder resolved"));
        assert!(!sink.contains("never logged"));
        assert_eq!(sink.len(), 2);

        let records = sink.records();
        assert_eq!(records[0]["fields"]["ingress"], "kafka");
    }

    #[test]
    fn test_memory_sink_lifecycle() {
        let (diagnostics, sink) = Diagnostics::memory();
        assert!(sink.is_empty());

        diagnostics.in_scope(|| tracing::warn!("before close"));
        sink.flush().unwrap();
        sink.close().unwrap();
        diagnostics.in_scope(|| tracing::warn!("after close"));

        assert!(sink.is_closed());
        assert!(sink.contains("before close"));
        assert!(!sink.contains("after close"));

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_attach_routes_task_logs() {
        let (diagnostics, sink) = Diagnostics::memory();

        tokio::spawn(diagnostics.attach(async {
            tracing::error!(error = "broker down", "kafka session error");
        }))
        .await
        .unwrap();

        assert!(sink.contains("kafka session error"));
        assert!(sink.contains("broker down"));
    }

    #[test]
    fn test_from_config_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tcptrail.log");
        let config = LogConfig {
            output: LogOutput::File(path.display().to_string()),
            ..Default::default()
        };

        let diagnostics = Diagnostics::from_config(&config).unwrap();
        assert_eq!(diagnostics.sink_kind(), "file");
        diagnostics.in_scope(|| tracing::info!("written to file"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("written to file"));
    }

    #[test]
    fn test_from_config_bad_file() {
        let config = LogConfig {
            output: LogOutput::File("/nonexistent-dir/tcptrail.log".into()),
            ..Default::default()
        };
        assert!(Diagnostics::from_config(&config).is_err());
    }
}
