//! CORS policy
//!
//! Credentials are always allowed, so "any origin" mirrors the request's
//! `Origin` instead of answering with `*`.

use crate::config::{AllowedOrigins, CorsConfig};
use hyper::header::HeaderValue;
use hyper::Method;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Methods advertised in preflight responses
pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::PUT,
    Method::PATCH,
    Method::POST,
    Method::DELETE,
];

/// Build the CORS layer from configuration
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let allow_origin = match config.origins() {
        AllowedOrigins::Any => AllowOrigin::mirror_request(),
        AllowedOrigins::List(list) => {
            // Browsers never send `*` as an Origin, so it can match nothing
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter(|o| o.as_str() != "*")
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring unparseable CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(ALLOWED_METHODS.to_vec())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
