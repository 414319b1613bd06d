//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (JSON structured logging)
//! - Custom patterns with variables

use chrono::Local;
use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::{Request, StatusCode, Version};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Access log entry containing all request/response information
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    #[serde(serialize_with = "serialize_rfc3339")]
    pub time: chrono::DateTime<Local>,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request URI path
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// HTTP version (1.0, 1.1, 2)
    pub http_version: String,
    /// Response status code
    pub status: u16,
    /// Response body size in bytes, when known up front
    pub body_bytes: Option<u64>,
    /// Referer header
    pub referer: Option<String>,
    /// User-Agent header
    pub user_agent: Option<String>,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Capture the request side of the entry with the current timestamp
    pub fn from_request<B>(req: &Request<B>, peer: SocketAddr) -> Self {
        let header = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            remote_addr: peer.ip().to_string(),
            time: Local::now(),
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            http_version: version_label(req.version()).to_string(),
            status: 200,
            body_bytes: None,
            referer: header(REFERER),
            user_agent: header(USER_AGENT),
            request_time_us: 0,
        }
    }

    /// Fill in the response side of the entry
    pub fn finish(&mut self, status: StatusCode, body_bytes: Option<u64>, elapsed: Duration) {
        self.status = status.as_u16();
        self.body_bytes = body_bytes;
        self.request_time_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn bytes_sent(&self) -> String {
        self.body_bytes
            .map_or_else(|| "-".to_string(), |b| b.to_string())
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent"`
    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.request_uri(),
            self.http_version,
            self.status,
            self.bytes_sent(),
        )
    }

    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables: `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$request_time` (seconds),
    /// `$status`, `$body_bytes_sent`, `$http_referer`, `$http_user_agent`.
    fn format_custom(&self, pattern: &str) -> String {
        let request_uri = self.request_uri();
        let request_line = format!("{} {} HTTP/{}", self.method, request_uri, self.http_version);
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;

        // $request_time and $request_* must be replaced before $request
        pattern
            .replace("$remote_addr", &self.remote_addr)
            .replace(
                "$time_local",
                &self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string(),
            )
            .replace("$time_iso8601", &self.time.to_rfc3339())
            .replace("$request_time", &format!("{request_time:.3}"))
            .replace("$request_method", &self.method)
            .replace("$request_uri", &request_uri)
            .replace("$request", &request_line)
            .replace("$status", &self.status.to_string())
            .replace("$body_bytes_sent", &self.bytes_sent())
            .replace("$http_referer", self.referer.as_deref().unwrap_or("-"))
            .replace("$http_user_agent", self.user_agent.as_deref().unwrap_or("-"))
    }
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

fn serialize_rfc3339<S: serde::Serializer>(
    time: &chrono::DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let req = Request::builder()
            .method("POST")
            .uri("/api/keystatic/update?branch=main")
            .header(REFERER, "https://admin.example")
            .header(USER_AGENT, "Mozilla/5.0")
            .body(())
            .unwrap();
        let mut entry = AccessLogEntry::from_request(&req, "192.168.1.1:50000".parse().unwrap());
        entry.finish(StatusCode::OK, Some(1234), Duration::from_micros(1500));
        entry
    }

    #[test]
    fn test_from_request() {
        let entry = create_test_entry();
        assert_eq!(entry.remote_addr, "192.168.1.1");
        assert_eq!(entry.path, "/api/keystatic/update");
        assert_eq!(entry.query.as_deref(), Some("branch=main"));
        assert_eq!(entry.request_time_us, 1500);
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.contains("192.168.1.1"));
        assert!(log.contains("POST /api/keystatic/update?branch=main HTTP/1.1"));
        assert!(log.contains("200 1234"));
        assert!(log.contains("https://admin.example"));
        assert!(log.contains("Mozilla/5.0"));
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.contains("POST /api/keystatic/update?branch=main HTTP/1.1"));
        assert!(log.contains("200 1234"));
        // Common format does not include referer/user-agent
        assert!(!log.contains("https://admin.example"));
    }

    #[test]
    fn test_format_unknown_size() {
        let mut entry = create_test_entry();
        entry.body_bytes = None;
        assert!(entry.format("common").ends_with("200 -"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let json: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(json["remote_addr"], "192.168.1.1");
        assert_eq!(json["method"], "POST");
        assert_eq!(json["status"], 200);
        assert_eq!(json["body_bytes"], 1234);
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry().format("$request_method $request_uri -> $status in $request_time");
        // 1500us = 0.0015s, formatted as 0.002 (3 decimal places)
        assert_eq!(log, "POST /api/keystatic/update?branch=main -> 200 in 0.002");
    }
}
