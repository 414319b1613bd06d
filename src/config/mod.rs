// Configuration module entry point
// Loads the gateway configuration and builds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    AllowedOrigins, CmsConfig, Config, CorsConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    RuntimeConfig, RuntimeMode, ServerConfig,
};

/// Default config file name (without extension), overridable via `GATEWAY_CONFIG`
pub const DEFAULT_CONFIG_PATH: &str = "gateway";

/// Plain environment variables that take precedence over every other source
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub port: Option<String>,
    pub allowed_origins: Option<String>,
    pub node_env: Option<String>,
}

impl EnvOverrides {
    /// Read `PORT`, `ALLOWED_ORIGINS` and `NODE_ENV` from the process environment
    pub fn from_process() -> Self {
        Self {
            port: std::env::var("PORT").ok(),
            allowed_origins: std::env::var("ALLOWED_ORIGINS").ok(),
            node_env: std::env::var("NODE_ENV").ok(),
        }
    }

    /// A blank `PORT` counts as unset
    fn port(&self) -> Option<String> {
        self.port
            .as_deref()
            .map(str::trim)
            .filter(|port| !port.is_empty())
            .map(String::from)
    }
}

impl Config {
    /// Load configuration using the process environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let path =
            std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path, &EnvOverrides::from_process())
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Precedence, lowest first: defaults, config file, `GATEWAY_*` variables,
    /// then the plain `PORT` / `ALLOWED_ORIGINS` / `NODE_ENV` overrides.
    pub fn load_from(config_path: &str, env: &EnvOverrides) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("runtime.node_env", "")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("cms.mount_path", "/api/keystatic")?
            .set_default("cms.timeout_secs", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.shutdown_grace_secs", 10)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", env.port())?
            .set_override_option("cors.allowed_origins", env.allowed_origins.clone())?
            .set_override_option("runtime.node_env", env.node_env.clone())?
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.cms.mount_path = normalize_mount_path(&cfg.cms.mount_path);
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    pub fn mode(&self) -> RuntimeMode {
        self.runtime.mode()
    }
}

/// Ensure a leading slash and strip trailing ones (`api/cms/` -> `/api/cms`)
fn normalize_mount_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{trimmed}")
}
