//! Tracing subscriber setup.
//!
//! `report` logs to stderr. The TUI owns the terminal, so it logs to `dash.log`
//! in the working directory instead.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "dash.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr, honouring `RUST_LOG` (default `warn`).
pub fn init_stderr() {
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Log to [`LOG_FILE`]; keep the guard alive until exit so buffered lines are flushed.
pub fn init_file() -> WorkerGuard {
    let appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .try_init();
    guard
}
