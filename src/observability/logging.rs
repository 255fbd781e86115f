//! Logging initialization for `bookwright`.
//!
//! Provides structured logging via `tracing` with human-readable and
//! JSON output formats on stderr, configurable verbosity, an optional
//! plain-text log file, and environment-based override via
//! `BOOKWRIGHT_LOG_LEVEL`.

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Mutex;

use clap::ValueEnum;
use tracing_subscriber::layer::{Layer, Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::cli::args::ColorChoice;

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Log output format.
///
/// Controls how log messages are rendered to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Maps a verbosity level to a tracing directive string.
///
/// - 0 → `"warn"`
/// - 1 → `"info"`
/// - 2 → `"debug"`
/// - 3+ → `"trace"` (saturates)
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initializes the global tracing subscriber.
///
/// If `BOOKWRIGHT_LOG_LEVEL` is set it takes precedence over `verbosity`.
/// When `log_file` is given, an uncolored copy of every record is appended
/// to it; missing parent directories are created.
///
/// Uses `try_init()` so calling this more than once (e.g. in tests) is safe.
///
/// # Errors
///
/// Returns an I/O error if the log file cannot be opened.
pub fn init_logging(
    format: LogFormat,
    verbosity: u8,
    color: ColorChoice,
    log_file: Option<&Path>,
) -> std::io::Result<()> {
    let default_directive = verbosity_to_directive(verbosity);

    let filter = EnvFilter::try_from_env("BOOKWRIGHT_LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let show_target = verbosity >= 2;

    let use_ansi = match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);

    layers.push(match format {
        LogFormat::Human => tracing_subscriber::fmt::layer()
            .with_ansi(use_ansi)
            .with_target(show_target)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(show_target)
            .with_writer(std::io::stderr)
            .boxed(),
    });

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_default_is_human() {
        assert_eq!(LogFormat::default(), LogFormat::Human);
    }

    #[test]
    fn init_logging_does_not_panic() {
        // try_init is idempotent: repeated calls simply return Err and are ignored
        init_logging(LogFormat::Human, 0, ColorChoice::Auto, None).unwrap();
        init_logging(LogFormat::Json, 3, ColorChoice::Never, None).unwrap();
    }

    #[test]
    fn init_logging_creates_log_file_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("build.log");
        init_logging(LogFormat::Human, 1, ColorChoice::Never, Some(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn verbosity_0_is_warn() {
        assert_eq!(verbosity_to_directive(0), "warn");
    }

    #[test]
    fn verbosity_1_is_info() {
        assert_eq!(verbosity_to_directive(1), "info");
    }

    #[test]
    fn verbosity_2_is_debug() {
        assert_eq!(verbosity_to_directive(2), "debug");
    }

    #[test]
    fn verbosity_255_is_trace() {
        assert_eq!(verbosity_to_directive(255), "trace");
    }
}
