//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Server lifecycle output
//! - Access logging with multiple formats
//! - Error and warning logging
//!
//! Diagnostics go through `tracing`; the startup banner is plain stdout.

mod format;

pub use format::AccessLogEntry;

use crate::config::{AccessLogFormat, LoggingConfig};
use crate::error::ServerError;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins over `logging.level` when set. Should be called once at
/// application startup.
pub fn init(config: &LoggingConfig) -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ServerError::Logger(format!("invalid log level '{}': {e}", config.level)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ServerError::Logger(e.to_string()))
}

pub fn log_server_start(addr: &SocketAddr) {
    println!("Server running at http://localhost:{}", addr.port());
    println!("Required headers for SharedArrayBuffer enabled");
    println!("Press Ctrl+C to stop");
    tracing::info!(address = %addr, "listening");
}

pub fn log_server_stopped() {
    println!("\nServer stopped.");
}

pub fn log_document_root(root: &std::path::Path) {
    tracing::info!(root = %root.display(), "serving files");
}

pub fn log_worker_threads(workers: Option<usize>) {
    match workers {
        Some(n) => tracing::debug!("using {n} worker threads"),
        None => tracing::debug!("using default worker threads (CPU cores)"),
    }
}

/// Aborted connections are routine (client went away), so debug level only
pub fn log_connection_error(peer_addr: &SocketAddr, err: &hyper::Error) {
    tracing::debug!(peer = %peer_addr, "connection ended with error: {err}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: AccessLogFormat) {
    tracing::info!(target: "access", "{}", entry.format(format));
}
