//! Optional transforms applied to snapshots before they are logged.
//!
//! A body filter and a headers filter are independent, optional
//! capabilities; absence means the snapshot is logged as-is. Filters run
//! on copies (see [`crate::record`]), never on live request or response
//! state, so redacting or rewriting a snapshot has no effect on the
//! downstream handler.

use bytes::Bytes;

use crate::record::{HeaderSnapshot, LogContext};

/// Transforms the copied body bytes before they are logged.
///
/// Implementations must be pure with respect to the request: the same
/// input body and context should produce the same output. Plain closures
/// implement this trait:
///
/// ```rust
/// use bytes::Bytes;
/// use reqlog::LogContext;
///
/// let truncate = |_cx: &LogContext, body: Bytes| -> Bytes {
///     body.slice(..body.len().min(1024))
/// };
/// # let _: &dyn reqlog::BodyFilter = &truncate;
/// ```
pub trait BodyFilter: Send + Sync {
    /// Returns the bytes to log in place of `body`.
    fn filter_body(&self, cx: &LogContext, body: Bytes) -> Bytes;
}

impl<F> BodyFilter for F
where
    F: Fn(&LogContext, Bytes) -> Bytes + Send + Sync,
{
    fn filter_body(&self, cx: &LogContext, body: Bytes) -> Bytes {
        self(cx, body)
    }
}

/// Transforms the copied header multimap before it is logged.
///
/// The input is always a defensive copy, so implementations may remove or
/// rewrite entries without affecting the live headers. Plain closures
/// implement this trait as well.
pub trait HeadersFilter: Send + Sync {
    /// Returns the header map to log in place of `headers`.
    fn filter_headers(&self, cx: &LogContext, headers: HeaderSnapshot) -> HeaderSnapshot;
}

impl<F> HeadersFilter for F
where
    F: Fn(&LogContext, HeaderSnapshot) -> HeaderSnapshot + Send + Sync,
{
    fn filter_headers(&self, cx: &LogContext, headers: HeaderSnapshot) -> HeaderSnapshot {
        self(cx, headers)
    }
}

/// Headers filter that drops a fixed set of header names from the logged
/// snapshot, compared case-insensitively.
///
/// The default set covers the usual credential-bearing headers.
///
/// ```rust
/// use reqlog::{RedactHeaders, RequestLogConfig};
///
/// let config = RequestLogConfig::new()
///     .with_headers_filter(RedactHeaders::new(["authorization", "x-internal-token"]));
/// ```
#[derive(Debug, Clone)]
pub struct RedactHeaders {
    names: Vec<String>,
}

impl RedactHeaders {
    /// Creates a filter that removes the given header names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Default for RedactHeaders {
    fn default() -> Self {
        Self::new([
            "authorization",
            "cookie",
            "set-cookie",
            "proxy-authorization",
            "x-api-key",
        ])
    }
}

impl HeadersFilter for RedactHeaders {
    fn filter_headers(&self, _cx: &LogContext, mut headers: HeaderSnapshot) -> HeaderSnapshot {
        headers.retain(|name, _| {
            !self
                .names
                .iter()
                .any(|redacted| name.eq_ignore_ascii_case(redacted))
        });
        headers
    }
}
