//! Tracing subscriber setup
//!
//! Console output honours `RUST_LOG` when set, otherwise `info` (or `debug`
//! in debug mode). When a log directory is given, every event at DEBUG and
//! above is also appended to `<logs_dir>/app.log`.

use crate::Result;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Name of the log file written inside the logs directory
pub const LOG_FILE_NAME: &str = "app.log";

/// Install the global subscriber
///
/// Fails if a global subscriber is already installed or the log file
/// cannot be opened.
pub fn init_logging(debug: bool, logs_dir: Option<&Path>) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(debug)
        .without_time()
        .with_filter(console_filter);

    let file_layer = match logs_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE_NAME))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::Error::Internal(format!("Failed to install subscriber: {}", e)))?;

    if debug {
        tracing::debug!("Debug mode enabled - detailed logging activated");
    }
    Ok(())
}
