//! Logging setup on `tracing` and `tracing-subscriber`.
//!
//! # Log Levels
//!
//! - `error`: fatal load or read failures
//! - `warn`: render issues (unresolved scopes, unknown labels), language fallback
//! - `info`: rule-file and CSV load progress, batch summary
//! - `debug`: per-record and per-section detail
//! - `trace`: per-variant decisions and patient values (values need `--log-data`)

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static LOG_DATA_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder logged instead of patient values.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Crates whose level follows the configured filter.
const WORKSPACE_CRATES: &[&str] = &[
    "medreport_cli",
    "medreport_core",
    "medreport_ingest",
    "medreport_model",
    "medreport_rules",
];

pub fn log_data_enabled() -> bool {
    LOG_DATA_ENABLED.load(Ordering::Relaxed)
}

/// Returns the value when patient data logging is enabled, otherwise a redacted token.
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() {
        value
    } else {
        REDACTED_VALUE
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` override `level_filter`.
    pub use_env_filter: bool,
    /// Prefix pretty and compact lines with a timestamp. JSON lines always carry one.
    pub with_timestamps: bool,
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Logs go here instead of stderr when set.
    pub log_file: Option<PathBuf>,
    /// Whether patient values may be logged.
    pub log_data: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_timestamps: false,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
            log_data: false,
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        init_logging_with_writer(config, SharedWriter::new(file));
    } else {
        init_logging_with_writer(config, io::stderr);
    }
    Ok(())
}

pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    LOG_DATA_ENABLED.store(config.log_data, Ordering::Release);
    tracing_subscriber::registry()
        .with(build_env_filter(config))
        .with(format_layer(config, writer))
        .init();
}

/// The `fmt` layer for the configured format. Event targets are left out;
/// every event already names its section or record.
fn format_layer<S, W>(config: &LogConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_target(false);
    match (config.format, config.with_timestamps) {
        // Closing spans log per-record render time.
        (LogFormat::Json, _) => layer.json().with_span_events(FmtSpan::CLOSE).boxed(),
        (LogFormat::Compact, true) => layer.compact().with_ansi(config.with_ansi).boxed(),
        (LogFormat::Compact, false) => layer
            .compact()
            .with_ansi(config.with_ansi)
            .without_time()
            .boxed(),
        (LogFormat::Pretty, true) => layer.with_ansi(config.with_ansi).boxed(),
        (LogFormat::Pretty, false) => layer.with_ansi(config.with_ansi).without_time().boxed(),
    }
}

/// Clonable writer handing out locked access to one sink.
#[derive(Debug)]
struct SharedWriter<T> {
    sink: Arc<Mutex<T>>,
}

impl<T> Clone for SharedWriter<T> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T: Write> SharedWriter<T> {
    fn new(sink: T) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }
}

impl<T: Write> Write for SharedWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink
            .lock()
            .map_err(|_| io::Error::other("log sink lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink
            .lock()
            .map_err(|_| io::Error::other("log sink lock poisoned"))?
            .flush()
    }
}

impl<'a, T: Write + 'a> MakeWriter<'a> for SharedWriter<T> {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Default directive string: `level` for every workspace crate, `warn` elsewhere.
pub fn default_directives(level_filter: LevelFilter) -> String {
    let level = level_filter.to_string().to_lowercase();
    WORKSPACE_CRATES
        .iter()
        .fold(String::from("warn"), |directives, name| {
            format!("{directives},{name}={level}")
        })
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let fallback = || EnvFilter::new(default_directives(config.level_filter));
    if config.use_env_filter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
    } else {
        fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_workspace_crates() {
        assert_eq!(
            default_directives(LevelFilter::DEBUG),
            "warn,medreport_cli=debug,medreport_core=debug,medreport_ingest=debug,\
             medreport_model=debug,medreport_rules=debug"
        );
    }

    fn capture(config: &LogConfig) -> String {
        let buffer = SharedWriter::new(Vec::new());
        let subscriber = tracing_subscriber::registry().with(format_layer(config, buffer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(table = "sex", "no label for code");
        });
        let bytes = buffer.sink.lock().expect("buffer lock").clone();
        String::from_utf8(bytes).expect("utf-8 log output")
    }

    fn plain(format: LogFormat, with_timestamps: bool) -> LogConfig {
        LogConfig {
            format,
            with_timestamps,
            with_ansi: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn compact_lines_start_with_the_level_unless_timestamped() {
        let line = capture(&plain(LogFormat::Compact, false));
        assert!(line.trim_start().starts_with("WARN"), "{line}");
        assert!(line.contains("no label for code"), "{line}");
        assert!(!line.contains("medreport_cli"), "{line}");

        let line = capture(&plain(LogFormat::Compact, true));
        assert!(line.starts_with(|c: char| c.is_ascii_digit()), "{line}");
    }

    #[test]
    fn json_lines_carry_timestamp_and_fields() {
        let line = capture(&plain(LogFormat::Json, false));
        let event: serde_json::Value = serde_json::from_str(line.trim()).expect("json line");
        assert!(event["timestamp"].is_string(), "{line}");
        assert_eq!(event["fields"]["message"], "no label for code");
        assert_eq!(event["fields"]["table"], "sex");
        assert!(event.get("target").is_none(), "{line}");
    }

    #[test]
    fn values_are_redacted_by_default() {
        assert!(!log_data_enabled());
        assert_eq!(redact_value("P-001"), REDACTED_VALUE);
    }
}
