//! Fixed JSON endpoints: health check and API discovery

use crate::http::{self, GatewayBody};
use chrono::{SecondsFormat, Utc};
use hyper::{Response, StatusCode};
use serde::Serialize;

pub const SERVICE_NAME: &str = "keystatic-cms";
pub const API_NAME: &str = "Keystatic CMS API";
pub const API_VERSION: &str = "1.0.0";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
    service: &'static str,
}

#[derive(Debug, Serialize)]
struct Discovery {
    name: &'static str,
    version: &'static str,
    endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
struct Endpoints {
    health: &'static str,
    api: String,
}

/// `GET /health`
pub fn health() -> Response<GatewayBody> {
    http::json_response(
        StatusCode::OK,
        &Health {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            service: SERVICE_NAME,
        },
    )
}

/// `GET /`
pub fn discovery(mount_path: &str) -> Response<GatewayBody> {
    let api = if mount_path == "/" {
        "/*".to_string()
    } else {
        format!("{mount_path}/*")
    };

    http::json_response(
        StatusCode::OK,
        &Discovery {
            name: API_NAME,
            version: API_VERSION,
            endpoints: Endpoints {
                health: HEALTH_PATH,
                api,
            },
        },
    )
}
