//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body size check, body parsing,
//! route matching, CMS delegation and the terminal error responder.

use crate::cms::MountPath;
use crate::config::AppState;
use crate::error::{BoxError, GatewayError, GatewayResult};
use crate::handler::status;
use crate::http::{self, body, GatewayBody};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Main entry point for HTTP request handling
///
/// Never fails: every error is turned into a response by [`http::error_response`].
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<GatewayBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    // Reject oversized bodies before reading them
    let result = match check_body_size(&req, state.config.http.max_body_size) {
        Ok(()) => dispatch(req, &state).await,
        Err(err) => Err(err),
    };

    // Every failure goes through the terminal responder
    Ok(result.unwrap_or_else(|err| http::error_response(&err, state.mode)))
}

/// Validate Content-Length header against the body limit
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> GatewayResult<()> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(size) if size > max_body_size => {
            tracing::warn!(size, max_body_size, "request body too large");
            Err(GatewayError::PayloadTooLarge {
                limit: max_body_size,
            })
        }
        _ => Ok(()),
    }
}

/// Buffer and decode the body, then route
async fn dispatch<B>(req: Request<B>, state: &Arc<AppState>) -> GatewayResult<Response<GatewayBody>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (mut parts, raw) = req.into_parts();
    let bytes = body::read_body(raw, state.config.http.max_body_size).await?;
    let parsed = body::parse_body(&parts.headers, &bytes)?;
    parts.extensions.insert(parsed);

    route_request(Request::from_parts(parts, bytes), state).await
}

/// Route request based on path and method
async fn route_request(
    mut req: Request<Bytes>,
    state: &Arc<AppState>,
) -> GatewayResult<Response<GatewayBody>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let is_get = method == Method::GET || method == Method::HEAD;
    let route = trim_trailing_slash(&path);

    // 1. Health check, registered ahead of the mount
    // 2. CMS mount (any method)
    // 3. Discovery
    let response = if is_get && route == status::HEALTH_PATH {
        status::health()
    } else if let Some(rest) = strip_mount(&path, &state.config.cms.mount_path) {
        req.extensions_mut().insert(MountPath(rest.to_string()));
        return call_cms(req, state).await;
    } else if is_get && route == "/" {
        status::discovery(&state.config.cms.mount_path)
    } else {
        tracing::debug!(%method, %path, "no route");
        http::build_404_response(&path)
    };

    let is_head = method == Method::HEAD;
    Ok(if is_head {
        http::response::strip_body(response)
    } else {
        response
    })
}

/// Run the CMS handler in its own task so a panic becomes an error
async fn call_cms(
    req: Request<Bytes>,
    state: &Arc<AppState>,
) -> GatewayResult<Response<GatewayBody>> {
    let cms = Arc::clone(&state.cms);
    match tokio::spawn(async move { cms.handle(req).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(GatewayError::HandlerPanicked),
        Err(e) => Err(GatewayError::Handler(e.to_string())),
    }
}

/// Path relative to the mount, or `None` when the path is outside it
///
/// `/api/keystatic` and `/api/keystatic/...` match, `/api/keystaticx` does not.
fn strip_mount<'a>(path: &'a str, mount: &str) -> Option<&'a str> {
    if mount == "/" {
        return Some(path);
    }
    match path.strip_prefix(mount)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::CmsHandler;
    use crate::config::{Config, EnvOverrides};
    use crate::http::ParsedBody;
    use async_trait::async_trait;
    use http_body_util::{BodyExt, Full};
    use hyper::StatusCode;
    use serde_json::{json, Value};

    /// Echoes what the handler received
    struct EchoHandler;

    #[async_trait]
    impl CmsHandler for EchoHandler {
        async fn handle(&self, req: Request<Bytes>) -> GatewayResult<Response<GatewayBody>> {
            let headers: serde_json::Map<String, Value> = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), json!(v.to_str().unwrap_or_default())))
                .collect();
            let parsed = match req.extensions().get::<ParsedBody>() {
                Some(ParsedBody::Json(v)) => json!({"json": v}),
                Some(ParsedBody::Form(m)) => json!({"form": m}),
                Some(ParsedBody::None) | None => Value::Null,
            };
            Ok(http::json_response(
                StatusCode::OK,
                &json!({
                    "method": req.method().as_str(),
                    "uri": req.uri().to_string(),
                    "mount_path": req.extensions().get::<MountPath>().map(MountPath::as_str),
                    "headers": headers,
                    "body": String::from_utf8_lossy(req.body()),
                    "parsed": parsed,
                }),
            ))
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl CmsHandler for FailingHandler {
        async fn handle(&self, _req: Request<Bytes>) -> GatewayResult<Response<GatewayBody>> {
            Err(GatewayError::Handler("content store unavailable".to_string()))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl CmsHandler for PanickingHandler {
        async fn handle(&self, _req: Request<Bytes>) -> GatewayResult<Response<GatewayBody>> {
            panic!("handler bug");
        }
    }

    fn state_with(cms: Arc<dyn CmsHandler>, node_env: Option<&str>) -> Arc<AppState> {
        let env = EnvOverrides {
            node_env: node_env.map(String::from),
            ..EnvOverrides::default()
        };
        let mut config = Config::load_from("this-config-file-does-not-exist", &env).unwrap();
        config.http.max_body_size = 64;
        Arc::new(AppState::new(config, cms))
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn send(req: Request<Full<Bytes>>, state: Arc<AppState>) -> (StatusCode, Value) {
        let resp = handle_request(req, state).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = send(
            request(Method::GET, "/health", ""),
            state_with(Arc::new(EchoHandler), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "keystatic-cms");
        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_health_trailing_slash_and_head() {
        let state = state_with(Arc::new(EchoHandler), None);
        let (status, _) = send(request(Method::GET, "/health/", ""), Arc::clone(&state)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(request(Method::HEAD, "/health", ""), state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, Value::Null);
    }

    #[tokio::test]
    async fn test_discovery() {
        let (status, json) = send(
            request(Method::GET, "/", ""),
            state_with(Arc::new(EchoHandler), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "Keystatic CMS API");
        assert_eq!(json["endpoints"]["health"], "/health");
        assert_eq!(json["endpoints"]["api"], "/api/keystatic/*");
    }

    #[tokio::test]
    async fn test_unknown_route_and_wrong_method() {
        let state = state_with(Arc::new(EchoHandler), None);
        let (status, json) = send(request(Method::GET, "/nope", ""), Arc::clone(&state)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["path"], "/nope");

        let (status, _) = send(request(Method::POST, "/health", ""), state).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cms_request_forwarded_unchanged() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/api/keystatic/update?branch=main")
            .header("content-type", "application/json")
            .header("x-keystatic-token", "secret")
            .body(Full::new(Bytes::from_static(br#"{"title":"Hi"}"#)))
            .unwrap();

        let (status, json) = send(req, state_with(Arc::new(EchoHandler), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["method"], "PUT");
        assert_eq!(json["uri"], "/api/keystatic/update?branch=main");
        assert_eq!(json["mount_path"], "/update");
        assert_eq!(json["headers"]["x-keystatic-token"], "secret");
        assert_eq!(json["headers"]["content-type"], "application/json");
        assert_eq!(json["body"], r#"{"title":"Hi"}"#);
        assert_eq!(json["parsed"]["json"]["title"], "Hi");
    }

    #[tokio::test]
    async fn test_cms_form_body_is_parsed() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/keystatic")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from_static(b"tag=a&tag=b")))
            .unwrap();

        let (_, json) = send(req, state_with(Arc::new(EchoHandler), None)).await;
        assert_eq!(json["mount_path"], "/");
        assert_eq!(json["body"], "tag=a&tag=b");
        assert_eq!(json["parsed"]["form"]["tag"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_mount_prefix_requires_boundary() {
        let (status, _) = send(
            request(Method::GET, "/api/keystaticx/tree", ""),
            state_with(Arc::new(EchoHandler), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_error_hides_message_in_production() {
        let (status, json) = send(
            request(Method::GET, "/api/keystatic/tree", ""),
            state_with(Arc::new(FailingHandler), Some("production")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal Server Error");
        assert!(json.get("message").is_none());
    }

    #[tokio::test]
    async fn test_handler_error_shows_message_in_development() {
        let (status, json) = send(
            request(Method::GET, "/api/keystatic/tree", ""),
            state_with(Arc::new(FailingHandler), Some("development")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "content store unavailable");
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        let (status, json) = send(
            request(Method::POST, "/api/keystatic/update", ""),
            state_with(Arc::new(PanickingHandler), Some("development")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "CMS handler panicked");
    }

    #[tokio::test]
    async fn test_malformed_json_goes_to_error_responder() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/keystatic/update")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{\"title\":")))
            .unwrap();
        let (status, json) = send(req, state_with(Arc::new(EchoHandler), None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json.get("message").is_none());
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let big = "x".repeat(65);
        let declared = |body: String| {
            Request::builder()
                .method(Method::POST)
                .uri("/api/keystatic/update")
                .header("content-length", body.len())
                .body(Full::new(Bytes::from(body)))
                .unwrap()
        };

        let (status, json) = send(
            declared(big.clone()),
            state_with(Arc::new(EchoHandler), Some("production")),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "Payload Too Large");
        assert!(json.get("message").is_none());

        let (status, json) = send(
            declared(big.clone()),
            state_with(Arc::new(EchoHandler), Some("development")),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["message"], "request entity too large (limit: 64 bytes)");

        // Without Content-Length the limit is enforced while reading
        let req = request(Method::POST, "/api/keystatic/update", "")
            .map(|_| Full::new(Bytes::from(big)));
        let state = state_with(Arc::new(EchoHandler), Some("production"));
        let (status, json) = send(req, state).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "Payload Too Large");
        assert!(json.get("message").is_none());
    }

    #[tokio::test]
    async fn test_health_wins_over_root_mount() {
        let mut config =
            Config::load_from("this-config-file-does-not-exist", &EnvOverrides::default()).unwrap();
        config.cms.mount_path = "/".to_string();
        let state = Arc::new(AppState::new(config, Arc::new(EchoHandler)));

        let (status, json) = send(request(Method::GET, "/health", ""), Arc::clone(&state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");

        // Everything else, including `/`, belongs to the CMS
        let (_, json) = send(request(Method::GET, "/", ""), Arc::clone(&state)).await;
        assert_eq!(json["mount_path"], "/");
        let (_, json) = send(request(Method::POST, "/health", ""), state).await;
        assert_eq!(json["method"], "POST");
    }

    #[test]
    fn test_strip_mount() {
        assert_eq!(strip_mount("/api/keystatic", "/api/keystatic"), Some("/"));
        assert_eq!(strip_mount("/api/keystatic/", "/api/keystatic"), Some("/"));
        assert_eq!(
            strip_mount("/api/keystatic/tree/main", "/api/keystatic"),
            Some("/tree/main")
        );
        assert_eq!(strip_mount("/api/keystaticx", "/api/keystatic"), None);
        assert_eq!(strip_mount("/health", "/api/keystatic"), None);
        assert_eq!(strip_mount("/anything", "/"), Some("/anything"));
    }
}
