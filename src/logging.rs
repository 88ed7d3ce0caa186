//! Tracing configuration and log routing.
//!
//! The client logs to stdout using a compact formatter, and optionally to a
//! file. When `DOCINGEST_LOG_FILE` is set, logs are appended to that path;
//! otherwise a file logger is created under `logs/docingest.log`. A
//! non-blocking writer keeps file logging off the hot paths.
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// Respects `RUST_LOG` for filtering and defaults to `info`. The worker
/// guard for the non-blocking file writer lives for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match file_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when neither the configured path nor the fallback
/// `logs/` directory can be opened.
fn file_writer() -> Option<NonBlocking> {
    let (non_blocking, guard) = match std::env::var("DOCINGEST_LOG_FILE") {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("Failed to open log file {path}: {err}"))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        Err(_) => {
            let log_dir = Path::new("logs");
            std::fs::create_dir_all(log_dir)
                .map_err(|err| eprintln!("Failed to create logs directory: {err}"))
                .ok()?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(
                log_dir,
                "docingest.log",
            ))
        }
    };

    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
