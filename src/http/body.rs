//! Request/response body handling
//!
//! Buffers inbound bodies under a size cap and decodes JSON and
//! URL-encoded payloads before any handler runs.

use crate::error::{BoxError, GatewayError, GatewayResult};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_TYPE};
use serde_json::{Map, Value};

/// Response body type shared by every route and CMS handler
pub type GatewayBody = UnsyncBoxBody<Bytes, BoxError>;

/// Body decoded from the request, attached as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBody {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`, decoded to an object
    Form(Map<String, Value>),
    /// Any other content type; only the raw bytes are available
    None,
}

/// Build a buffered response body
pub fn full(data: impl Into<Bytes>) -> GatewayBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Build an empty response body
pub fn empty() -> GatewayBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Collect the whole request body, failing once `limit` bytes are exceeded
pub async fn read_body<B>(body: B, limit: u64) -> GatewayResult<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let cap = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, cap).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(GatewayError::PayloadTooLarge { limit })
        }
        Err(e) => Err(GatewayError::Body(e)),
    }
}

/// Decode the body according to its `Content-Type`
pub fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> GatewayResult<ParsedBody> {
    match media_type(headers).as_deref() {
        Some("application/json") => parse_json(bytes).map(ParsedBody::Json),
        Some("application/x-www-form-urlencoded") => Ok(ParsedBody::Form(parse_form(bytes))),
        _ => Ok(ParsedBody::None),
    }
}

/// Lowercased media type without parameters (`Application/JSON; charset=utf-8` -> `application/json`)
fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next()?.trim();
    if essence.is_empty() {
        None
    } else {
        Some(essence.to_ascii_lowercase())
    }
}

/// Strict JSON: only objects and arrays are accepted at the top level
fn parse_json(bytes: &[u8]) -> GatewayResult<Value> {
    let Some(&first) = bytes.iter().find(|b| !b.is_ascii_whitespace()) else {
        return Ok(Value::Object(Map::new()));
    };

    if first != b'{' && first != b'[' {
        return Err(GatewayError::MalformedJson(format!(
            "unexpected token '{}' at top level, expected object or array",
            char::from(first)
        )));
    }

    serde_json::from_slice(bytes).map_err(|e| GatewayError::MalformedJson(e.to_string()))
}

/// Repeated keys collect into an array of strings
fn parse_form(bytes: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use serde_json::json;

    fn headers(content_type: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        map
    }

    #[test]
    fn test_parse_json_object() {
        let parsed = parse_body(
            &headers("application/json; charset=utf-8"),
            br#"{"title":"Hello","tags":["a"]}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ParsedBody::Json(json!({"title": "Hello", "tags": ["a"]}))
        );
    }

    #[test]
    fn test_json_suffix_types_are_left_raw() {
        let parsed = parse_body(&headers("application/vnd.api+json"), b"[1,2]").unwrap();
        assert_eq!(parsed, ParsedBody::None);

        // Malformed bodies of these types still reach the handler
        let parsed = parse_body(&headers("application/merge-patch+json"), b"{\"title\":").unwrap();
        assert_eq!(parsed, ParsedBody::None);
    }

    #[test]
    fn test_parse_json_empty_is_empty_object() {
        let parsed = parse_body(&headers("application/json"), b"  \n").unwrap();
        assert_eq!(parsed, ParsedBody::Json(json!({})));
    }

    #[test]
    fn test_parse_json_strict_rejects_primitives() {
        let err = parse_body(&headers("application/json"), b"\"just a string\"").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedJson(_)));
    }

    #[test]
    fn test_parse_json_malformed() {
        let err = parse_body(&headers("application/json"), b"{\"title\":").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedJson(_)));
    }

    #[test]
    fn test_parse_form_repeated_keys() {
        let parsed = parse_body(
            &headers("application/x-www-form-urlencoded"),
            b"title=Hello+World&tag=a&tag=b&tag=c&empty=",
        )
        .unwrap();
        let ParsedBody::Form(map) = parsed else {
            panic!("expected form body");
        };
        assert_eq!(map["title"], json!("Hello World"));
        assert_eq!(map["tag"], json!(["a", "b", "c"]));
        assert_eq!(map["empty"], json!(""));
    }

    #[test]
    fn test_other_content_types_are_not_parsed() {
        let parsed = parse_body(&headers("text/markdown"), b"# Title").unwrap();
        assert_eq!(parsed, ParsedBody::None);
        assert_eq!(parse_body(&HeaderMap::new(), b"{}").unwrap(), ParsedBody::None);
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let bytes = read_body(Full::new(Bytes::from_static(b"hello")), 5)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_read_body_over_limit() {
        let err = read_body(Full::new(Bytes::from_static(b"hello!")), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::PayloadTooLarge { limit: 5 }));
    }
}
