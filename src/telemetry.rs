//! Logging setup for the gateway process.
//!
//! Stdout carries the MCP protocol, so nothing may write there. Diagnostics
//! go to stderr and to a log file under the configured directory.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber, writing to `log_dir/server.log`
/// and stderr. Filtering follows `RUST_LOG`.
pub fn setup_logging(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    // Set up file appender
    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, "server.log");

    // Create a logging layer that writes to the file
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}
