//! Process-wide logging setup
//!
//! Logs go to a rolling file under `logs/` and to stderr. Stdout is never
//! written to: in stdio transport mode it carries the MCP protocol stream.
//! The filter honors `RUST_LOG` when set and falls back to `LOG_LEVEL`
//! (default `info`).

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env_var_or;

/// Log file name (rotated daily by the appender).
const LOG_FILE: &str = "commvault-mcp.log";

/// Directory the rolling log files are written to.
const LOG_DIR: &str = "logs";

/// Initializes the global tracing subscriber.
///
/// Returns the appender worker guard; the caller must keep it alive for the
/// lifetime of the process or buffered log lines are lost on exit.
pub fn init_logging() -> WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = env_var_or("LOG_LEVEL", "info").to_lowercase();
        EnvFilter::new(format!("commvault_mcp={level}"))
    });

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}
