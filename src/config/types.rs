// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    pub http: HttpConfig,
    pub cms: CmsConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Process environment settings (`NODE_ENV`)
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    pub node_env: String,
}

impl RuntimeConfig {
    pub fn mode(&self) -> RuntimeMode {
        RuntimeMode::from_node_env(&self.node_env)
    }
}

/// Runtime mode derived from `NODE_ENV`
///
/// Only `Development` exposes error details to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    Production,
    Other,
}

impl RuntimeMode {
    pub fn from_node_env(value: &str) -> Self {
        match value {
            "development" => Self::Development,
            "production" => Self::Production,
            _ => Self::Other,
        }
    }

    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Other => "unspecified",
        }
    }
}

/// CORS configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorsConfig {
    /// Comma-separated origin list (`ALLOWED_ORIGINS`); unset means any origin
    #[serde(default)]
    pub allowed_origins: Option<String>,
}

/// Allowed origins after parsing the comma-separated list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl CorsConfig {
    /// Only an unset list allows any origin; a set but blank list allows none
    pub fn origins(&self) -> AllowedOrigins {
        let Some(raw) = self.allowed_origins.as_deref() else {
            return AllowedOrigins::Any;
        };

        AllowedOrigins::List(
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect(),
        )
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub max_body_size: u64,
}

/// CMS handler configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CmsConfig {
    /// URL prefix delegated to the CMS handler
    pub mount_path: String,
    /// Keystatic backend to forward to (e.g. `http://127.0.0.1:3001`)
    #[serde(default)]
    pub upstream_url: Option<String>,
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
    pub shutdown_grace_secs: u64,
}
