// Application state module
// Process-lifetime configuration shared by every connection

use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::types::{Config, RuntimeMode};
use crate::cms::CmsHandler;
use crate::http::build_cors_layer;

/// Application state, built once at startup and read-only afterwards
pub struct AppState {
    pub config: Config,
    pub mode: RuntimeMode,
    pub cms: Arc<dyn CmsHandler>,
    pub cors: CorsLayer,
}

impl AppState {
    pub fn new(config: Config, cms: Arc<dyn CmsHandler>) -> Self {
        let mode = config.mode();
        let cors = build_cors_layer(&config.cors);
        Self {
            config,
            mode,
            cms,
            cors,
        }
    }
}
