//! CMS handler seam
//!
//! The gateway mounts a [`CmsHandler`] under the configured prefix and
//! hands it every matching request, untouched. Which handler runs is
//! decided at startup: a Keystatic backend reachable over HTTP, or a
//! placeholder when none is configured.

mod upstream;

use crate::config::CmsConfig;
use crate::error::GatewayResult;
use crate::http::{self, GatewayBody};
use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::{Request, Response};
use std::sync::Arc;

pub use upstream::UpstreamHandler;

/// Opaque request handler implementing the content-editing API
///
/// The request body is already buffered; a [`crate::http::ParsedBody`] and a
/// [`MountPath`] are available in the request extensions.
#[async_trait]
pub trait CmsHandler: Send + Sync {
    async fn handle(&self, req: Request<Bytes>) -> GatewayResult<Response<GatewayBody>>;
}

/// Request path relative to the mount prefix (always starts with `/`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPath(pub String);

impl MountPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Answers 503 for every request; used when no backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredHandler;

#[async_trait]
impl CmsHandler for UnconfiguredHandler {
    async fn handle(&self, _req: Request<Bytes>) -> GatewayResult<Response<GatewayBody>> {
        Ok(http::build_503_response("CMS backend is not configured"))
    }
}

/// Pick the handler described by the configuration
pub fn from_config(config: &CmsConfig) -> GatewayResult<Arc<dyn CmsHandler>> {
    match config.upstream_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            let handler = UpstreamHandler::new(url, config.timeout_secs)?;
            tracing::info!(upstream = %url, "CMS requests are forwarded upstream");
            Ok(Arc::new(handler))
        }
        _ => {
            tracing::warn!("no CMS upstream configured; the CMS API will answer 503");
            Ok(Arc::new(UnconfiguredHandler))
        }
    }
}
