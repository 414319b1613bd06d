//! Request handler module
//!
//! Composes the per-connection service: access logging, then CORS, then the
//! router.

pub mod router;
pub mod status;

use crate::config::AppState;
use crate::error::BoxError;
use crate::http::GatewayBody;
use crate::logger::{self, AccessLogEntry};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt};

// Re-export main entry point
pub use router::handle_request;

/// Gateway service for one client connection
pub fn service<B>(
    state: Arc<AppState>,
    peer: SocketAddr,
) -> BoxCloneService<Request<B>, Response<GatewayBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let access_format = state
        .config
        .logging
        .access_log
        .then(|| state.config.logging.access_log_format.clone());

    let app = ServiceBuilder::new()
        .layer(state.cors.clone())
        .service_fn(move |req: Request<B>| handle_request(req, Arc::clone(&state)));

    let logged = tower::service_fn(move |req: Request<B>| {
        let app = app.clone();
        let access_format = access_format.clone();
        async move {
            let Some(format) = access_format else {
                return app.oneshot(req).await;
            };

            let mut entry = AccessLogEntry::from_request(&req, peer);
            let started = Instant::now();
            let response = app.oneshot(req).await?;
            entry.finish(
                response.status(),
                response.body().size_hint().exact(),
                started.elapsed(),
            );
            logger::log_access(&entry, &format);
            Ok(response)
        }
    });

    BoxCloneService::new(logged)
}
