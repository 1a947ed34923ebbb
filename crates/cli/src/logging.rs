//! Logging setup
//!
//! Console output goes to stderr so it never mixes with tables on stdout.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: console filter (default: `batchprint=warn`)
//! - `BATCHPRINT_LOG_FORMAT`: `pretty` (default) or `json`

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FORMAT_ENV: &str = "BATCHPRINT_LOG_FORMAT";
const DEFAULT_CONSOLE_FILTER: &str = "batchprint=warn";
const DEFAULT_FILE_FILTER: &str = "batchprint=info";
const LOG_FILE_PREFIX: &str = "batchprint.log";

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string());

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_CONSOLE_FILTER))?;

    // File: JSON lines, daily rotation
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::try_new(DEFAULT_FILE_FILTER)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(file_layer);

    match log_format.as_str() {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_filter(console_filter),
                )
                .try_init()?;
        }
        _ => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_filter(console_filter),
                )
                .try_init()?;
        }
    }

    Ok(guard)
}
