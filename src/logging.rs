//! # Structured Logging
//!
//! Initializes the `tracing` subscriber. `RUST_LOG` overrides the default filter.
//! Output goes to stderr unless a log file is given.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "iban_issuer=info,tower_http=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable output for local development.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

/// Initialize the global tracing subscriber.
///
/// Call this exactly once, early in `main()`. Subsequent calls will panic.
pub fn init_logging(
    default_level: &str,
    format: LogFormat,
    log_file: Option<&Path>,
) -> std::io::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match (format, log_file) {
        (LogFormat::Pretty, None) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        (LogFormat::Json, None) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        (LogFormat::Pretty, Some(path)) => {
            let file = Mutex::new(File::create(path)?);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        (LogFormat::Json, Some(path)) => {
            let file = Mutex::new(File::create(path)?);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(file))
                .init();
        }
    }

    tracing::info!("logging initialized (format={:?})", format);
    Ok(())
}
