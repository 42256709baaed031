// src/logging.rs

//! Logging setup for `depwatch` using `tracing` + `tracing-subscriber`.
//!
//! Filter priority:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `DEPWATCH_LOG` environment variable, any `EnvFilter` directive
//!    (e.g. `"debug"` or `"depwatch::watch=debug,info"`)
//! 3. default to `info`
//!
//! Logs go to STDERR; bundles are written to files, never to stdout.
//!
//! Watch bookkeeping ("Watching entry", "Unwatching dependencies", ...) is
//! logged through [`watch_log!`] at the level chosen by `[config].log_watch`,
//! so it can be surfaced at `info` without turning on all debug output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const LOG_ENV: &str = "DEPWATCH_LOG";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(directive(level)),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Log at the configured watch level (`log_watch`).
macro_rules! watch_log {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            $crate::types::WatchLogLevel::Debug => ::tracing::debug!($($arg)+),
            $crate::types::WatchLogLevel::Info => ::tracing::info!($($arg)+),
        }
    };
}

pub(crate) use watch_log;
