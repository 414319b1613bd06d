//! Forwarding to a Keystatic backend over HTTP

use super::CmsHandler;
use crate::error::{GatewayError, GatewayResult};
use crate::http::GatewayBody;
use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, CONNECTION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE};
use hyper::http::uri::{Authority, PathAndQuery, Scheme};
use hyper::{Request, Response, Uri, Version};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

/// Proxies CMS requests to an upstream Keystatic API server
pub struct UpstreamHandler {
    client: Client<HttpConnector, Full<Bytes>>,
    scheme: Scheme,
    authority: Authority,
    timeout: Duration,
}

impl UpstreamHandler {
    pub fn new(url: &str, timeout_secs: u64) -> GatewayResult<Self> {
        Self::with_timeout(url, Duration::from_secs(timeout_secs))
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> GatewayResult<Self> {
        let invalid = |reason: &str| GatewayError::InvalidUpstream {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| invalid(&e.to_string()))?;
        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| invalid("missing scheme"))?;
        if scheme != Scheme::HTTP {
            return Err(invalid("only http:// upstreams are supported"));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| invalid("missing host"))?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            client,
            scheme,
            authority,
            timeout,
        })
    }

    /// Swap scheme and authority, keeping path and query as received
    fn target_uri(&self, uri: &Uri) -> GatewayResult<Uri> {
        let path_and_query = uri.path_and_query().map_or("/", PathAndQuery::as_str);
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| GatewayError::Upstream(Box::new(e)))
    }
}

#[async_trait]
impl CmsHandler for UpstreamHandler {
    async fn handle(&self, req: Request<Bytes>) -> GatewayResult<Response<GatewayBody>> {
        let (mut parts, body) = req.into_parts();
        parts.uri = self.target_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);

        tracing::debug!(method = %parts.method, uri = %parts.uri, "forwarding CMS request");
        let upstream_req = Request::from_parts(parts, Full::new(body));

        let response = tokio::time::timeout(self.timeout, self.client.request(upstream_req))
            .await
            .map_err(|_| GatewayError::UpstreamTimeout(self.timeout.as_secs()))?
            .map_err(|e| GatewayError::Upstream(Box::new(e)))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(
            parts,
            body.map_err(Into::into).boxed_unsync(),
        ))
    }
}

/// Remove connection-scoped headers, including any named by `Connection`
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }

    for name in [CONNECTION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}
