//! Logger module
//!
//! Provides logging utilities for the gateway including:
//! - `tracing` subscriber setup
//! - Server lifecycle logging
//! - Access logging with multiple formats

mod format;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used for access log lines, filterable via `RUST_LOG=access=off`
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber
///
/// `RUST_LOG` wins over the configured level. Should be called once at startup.
pub fn init(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    let mount = &config.cms.mount_path;
    tracing::info!(
        %addr,
        mode = config.mode().as_str(),
        "Keystatic CMS gateway running on port {}",
        addr.port()
    );
    tracing::info!("API endpoint: http://localhost:{}{mount}", addr.port());
    tracing::info!("Health check: http://localhost:{}/health", addr.port());
    match config.cors.allowed_origins.as_deref() {
        Some(origins) => tracing::info!(%origins, "CORS restricted to configured origins"),
        None => tracing::info!("CORS accepts any origin"),
    }
    if let Some(workers) = config.server.workers {
        tracing::info!(workers, "worker threads configured");
    }
}

pub fn log_connection_rejected(current: usize, max: u64) {
    tracing::warn!(current, max, "max connections reached, connection rejected");
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    tracing::debug!(error = %err, "failed to serve connection");
}

pub fn log_accept_error(err: &std::io::Error) {
    tracing::error!(error = %err, "failed to accept connection");
}

pub fn log_shutdown(active: usize) {
    tracing::info!(active, "shutting down, waiting for active connections");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
