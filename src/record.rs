//! Snapshot types for the per-request log record.
//!
//! Everything in this module is a defensive copy: the record fragments are
//! built from cloned request/response state, so nothing the downstream
//! handler mutates can leak into what gets logged, and nothing a filter
//! does to a snapshot can leak back into the live request.

use axum::extract::{MatchedPath, Request};
use axum::http::{HeaderMap, Method, Uri};
use serde::Serialize;
use std::collections::BTreeMap;

/// Ordered multimap used for logged header and query snapshots.
///
/// Keys are sorted; the order of repeated values is preserved.
pub type HeaderSnapshot = BTreeMap<String, Vec<String>>;

/// By-value snapshot of the request identity, taken when the request
/// enters the interceptor.
///
/// The method, URI, and matched route pattern are cloned up front, so a
/// handler that rewrites its own view of the URI cannot change what gets
/// logged. The same context is passed to both filters and the sink for
/// the request and response stages of a single request.
#[derive(Debug, Clone)]
pub struct LogContext {
    method: Method,
    uri: Uri,
    route: Option<String>,
}

impl LogContext {
    pub(crate) fn from_request(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            route: request
                .extensions()
                .get::<MatchedPath>()
                .map(|path| path.as_str().to_owned()),
        }
    }

    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI as it was at interceptor entry.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Route pattern matched by the router (e.g. `/users/{id}`), when the
    /// interceptor runs inside an axum `Router`.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }
}

/// Deep-copies a live header map into a [`HeaderSnapshot`].
///
/// Every name and value is copied; non-UTF-8 values are replaced
/// lossily. The returned map shares no storage with the input, so
/// filters may mutate it freely.
pub fn snapshot_headers(headers: &HeaderMap) -> HeaderSnapshot {
    let mut snapshot = HeaderSnapshot::new();
    for (name, value) in headers {
        snapshot
            .entry(name.as_str().to_owned())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    snapshot
}

/// Decodes a raw query string into a multimap.
///
/// Repeated keys accumulate in order of appearance. Decoding is
/// best-effort: a malformed query yields an empty map rather than an
/// error, since the result is only ever logged.
pub(crate) fn parse_query(query: &str) -> BTreeMap<String, Vec<String>> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        map.entry(key).or_default().push(value);
    }
    map
}

/// Routing metadata for one request.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRecord {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Route pattern matched by the router, falling back to the path
    /// when no pattern is available.
    pub route: String,
    /// Escaped request path.
    pub path: String,
    /// Decoded query string as a multimap.
    pub query: BTreeMap<String, Vec<String>>,
}

impl RouteRecord {
    pub(crate) fn from_context(cx: &LogContext) -> Self {
        Self {
            method: cx.method().to_string(),
            route: cx.route().unwrap_or_else(|| cx.uri().path()).to_owned(),
            path: cx.uri().path().to_owned(),
            query: parse_query(cx.uri().query().unwrap_or_default()),
        }
    }
}

/// Immutable request-side fragment of the log record, built before the
/// downstream handler runs.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    /// Routing metadata.
    pub route: RouteRecord,
    /// Filtered copy of the request headers.
    pub headers: HeaderSnapshot,
    /// Filtered request body as text.
    pub body: String,
}

/// Immutable response-side fragment, built after the downstream handler
/// returns.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    /// HTTP status code.
    pub status: u16,
    /// Filtered copy of the response headers.
    pub headers: HeaderSnapshot,
    /// Filtered response body as text.
    pub body: String,
}

/// The full per-request record, merged from the two fragments at
/// emission time.
///
/// The request stage serializes as `{"request": …}`; the response stage
/// re-serializes the same request fragment together with the response
/// fragment as `{"request": …, "response": …}`. Built fresh per request
/// and discarded after serialization.
#[derive(Debug, Serialize)]
pub struct LogRecord<'a> {
    /// Request-side fragment.
    pub request: &'a RequestRecord,
    /// Response-side fragment, absent in the pre-handler emission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<&'a ResponseRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn context_for(uri: &'static str) -> LogContext {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        LogContext::from_request(&request)
    }

    #[test]
    fn snapshot_copies_multi_value_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("host", HeaderValue::from_static("example.com"));

        let snapshot = snapshot_headers(&headers);
        assert_eq!(
            snapshot["accept"],
            vec!["text/html".to_owned(), "application/json".to_owned()]
        );
        assert_eq!(snapshot["host"], vec!["example.com".to_owned()]);
    }

    #[test]
    fn snapshot_mutation_does_not_touch_live_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer xyz"));

        let mut snapshot = snapshot_headers(&headers);
        snapshot.remove("authorization");

        assert!(snapshot.is_empty());
        assert_eq!(headers["authorization"], "Bearer xyz");
    }

    #[test]
    fn snapshot_replaces_non_utf8_values_lossily() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-raw",
            HeaderValue::from_bytes(&[0x61, 0xff, 0x62]).unwrap(),
        );

        let snapshot = snapshot_headers(&headers);
        assert_eq!(snapshot["x-raw"], vec!["a\u{fffd}b".to_owned()]);
    }

    #[test]
    fn query_multimap_accumulates_repeated_keys() {
        let query = parse_query("tag=a&tag=b&active=true");
        assert_eq!(query["tag"], vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(query["active"], vec!["true".to_owned()]);
    }

    #[test]
    fn query_decodes_percent_escapes() {
        let query = parse_query("name=hello%20world");
        assert_eq!(query["name"], vec!["hello world".to_owned()]);
    }

    #[test]
    fn empty_query_yields_empty_map() {
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn route_falls_back_to_path_without_matched_route() {
        let cx = context_for("/users/42?active=true");
        let route = RouteRecord::from_context(&cx);

        assert_eq!(route.method, "GET");
        assert_eq!(route.route, "/users/42");
        assert_eq!(route.path, "/users/42");
        assert_eq!(route.query["active"], vec!["true".to_owned()]);
    }

    #[test]
    fn pre_stage_record_omits_response() {
        let cx = context_for("/hello");
        let request = RequestRecord {
            route: RouteRecord::from_context(&cx),
            headers: HeaderSnapshot::new(),
            body: String::new(),
        };

        let json = serde_json::to_string(&LogRecord {
            request: &request,
            response: None,
        })
        .unwrap();

        assert!(json.starts_with("{\"request\":"));
        assert!(!json.contains("\"response\""));
    }

    #[test]
    fn post_stage_record_nests_both_fragments() {
        let cx = context_for("/hello");
        let request = RequestRecord {
            route: RouteRecord::from_context(&cx),
            headers: HeaderSnapshot::new(),
            body: String::new(),
        };
        let response = ResponseRecord {
            status: 404,
            headers: HeaderSnapshot::new(),
            body: "{\"error\":\"not found\"}".to_owned(),
        };

        let json = serde_json::to_string(&LogRecord {
            request: &request,
            response: Some(&response),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["request"]["route"]["path"], "/hello");
        assert_eq!(value["response"]["status"], 404);
        assert_eq!(value["response"]["body"], "{\"error\":\"not found\"}");
    }
}
