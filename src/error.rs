//! Gateway error types.

use hyper::StatusCode;
use thiserror::Error;

/// Boxed error used for request/response bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while handling a request.
///
/// Every variant ends up at the terminal error responder.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    #[error("request entity too large (limit: {limit} bytes)")]
    PayloadTooLarge { limit: u64 },

    #[error("malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("invalid upstream URL '{url}': {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("upstream request failed: {0}")]
    Upstream(#[source] BoxError),

    #[error("upstream did not respond within {0} seconds")]
    UpstreamTimeout(u64),

    #[error("CMS handler panicked")]
    HandlerPanicked,

    #[error("{0}")]
    Handler(String),
}

impl GatewayError {
    /// HTTP status the error responder answers with
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias using `GatewayError`.
pub type GatewayResult<T> = Result<T, GatewayError>;
