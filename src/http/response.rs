//! HTTP response building module
//!
//! Provides builders for the gateway's JSON responses and the terminal error responder.

use crate::config::RuntimeMode;
use crate::error::GatewayError;
use crate::http::body::{self, GatewayBody};
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,
}

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<GatewayBody> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            return fallback(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"Internal Server Error"}"#,
            );
        }
    };

    let len = json.len();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .header(CONTENT_LENGTH, len)
        .body(body::full(json))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            fallback(status, "")
        })
}

/// Drop the body of a response while keeping its headers (HEAD requests)
pub fn strip_body(response: Response<GatewayBody>) -> Response<GatewayBody> {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, body::empty())
}

/// Build 404 Not Found response
pub fn build_404_response(path: &str) -> Response<GatewayBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorBody {
            error: "Not Found",
            message: None,
            path: Some(path),
        },
    )
}

/// Build 503 Service Unavailable response
pub fn build_503_response(message: &str) -> Response<GatewayBody> {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        &ErrorBody {
            error: "Service Unavailable",
            message: Some(message.to_string()),
            path: None,
        },
    )
}

/// Terminal error responder
///
/// Logs the error and hides its message unless running in development mode.
pub fn error_response(err: &GatewayError, mode: RuntimeMode) -> Response<GatewayBody> {
    tracing::error!(error = %err, "request failed");

    let status = err.status();
    let error = match status {
        StatusCode::PAYLOAD_TOO_LARGE => "Payload Too Large",
        _ => "Internal Server Error",
    };

    json_response(
        status,
        &ErrorBody {
            error,
            message: mode.is_development().then(|| err.to_string()),
            path: None,
        },
    )
}

fn fallback(status: StatusCode, text: &'static str) -> Response<GatewayBody> {
    let mut response = Response::new(body::full(text));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    tracing::error!(%status, error = %error, "failed to build response");
}
