//! Structured logging setup.
//!
//! File output goes to a rolling daily log under the platform data
//! directory; console output goes to stderr in a compact human format.
//! The filter honors `RUST_LOG` and defaults to `info` with the chattier
//! transport internals damped.

use std::fs;
use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log directory: `{data_dir}/scene-bridge/logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scene-bridge")
        .join("logs")
}

/// Initialize the tracing subscriber (file + console).
///
/// # Panics
///
/// Panics if a subscriber is already installed. Use [`try_init`] for
/// fallible initialization.
pub fn init() {
    let log_dir = default_log_dir();
    let _ = fs::create_dir_all(&log_dir);

    // Daily rotation, keeping the last 5 files.
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("bridge")
        .filename_suffix("log")
        .max_log_files(5)
        .build(&log_dir)
        .expect("Failed to create log file appender");

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .compact();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tungstenite=warn,tokio_tungstenite=warn,mio=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!(log_dir = %log_dir.display(), "Logger initialized");
}

/// Try to initialize the logger, returning an error instead of panicking if
/// one is already installed.
pub fn try_init() -> Result<(), String> {
    let result = std::panic::catch_unwind(init);
    match result {
        Ok(()) => Ok(()),
        Err(_) => Err("Logger already initialized or initialization failed".into()),
    }
}
