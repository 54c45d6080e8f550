//! Structured Logger
//!
//! Wraps `tracing` with a console layer on stderr and an optional daily
//! rolling NDJSON file. `RUST_LOG` overrides the configured level.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "codecontext.log";

/// Initialize the global structured logger.
///
/// Console output goes to stderr so replies printed on stdout stay clean.
/// When `log_dir` is given, NDJSON is also written to
/// `<log_dir>/codecontext.log.YYYY-MM-DD`.
pub fn init_logger(level: &str, log_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {level}"))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}
