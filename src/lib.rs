//! # Reqlog
//!
//! A Tower middleware for axum that logs a structured snapshot of every
//! request before its handler runs and a combined request/response
//! snapshot after it returns.
//!
//! ## Features
//!
//! - **Two-stage protocol**: one debug-level `Received request:` line
//!   before the downstream handler, one `Sent response:` line after
//! - **Defensive snapshots**: headers, body, and URL are copied before
//!   logging, so neither filters nor the downstream handler can observe
//!   each other's mutations
//! - **Pluggable filters**: optional body and header transforms (e.g.
//!   redaction), configurable process-wide or per derivation
//! - **Pluggable sink**: log lines go to a narrow [`LogSink`] trait,
//!   backed by `tracing` by default
//!
//! Bodies are buffered in full to build the snapshots; wrap only routes
//! whose payloads you are willing to hold in memory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{error_handling::HandleErrorLayer, http::StatusCode, routing::get, Router};
//! use reqlog::{RedactHeaders, RequestLogConfig, RequestLogger};
//! use tower::{BoxError, ServiceBuilder};
//!
//! async fn hello() -> &'static str {
//!     "Hello, World!"
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let logger = RequestLogger::new(
//!         RequestLogConfig::new().with_headers_filter(RedactHeaders::default()),
//!     );
//!
//!     // The interceptor surfaces body-read failures as errors, so the
//!     // stack needs an error handler to shape them into responses.
//!     let app: Router = Router::new().route("/hello", get(hello)).layer(
//!         ServiceBuilder::new()
//!             .layer(HandleErrorLayer::new(|err: BoxError| async move {
//!                 (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
//!             }))
//!             .layer(logger.layer()),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! ## Per-route overrides
//!
//! [`RequestLogger::layer_with`] derives a wrapper from the base
//! configuration plus a one-shot override, without mutating the base:
//!
//! ```rust
//! use reqlog::{NoopSink, RequestLogConfig, RequestLogger};
//!
//! let logger = RequestLogger::default();
//!
//! // Disabled override: no wrapper at all, the route runs unwrapped.
//! assert!(logger.layer_with(RequestLogConfig::new().disable()).is_none());
//!
//! // Route-specific sink; filters stay unset unless the override names them.
//! let layer = logger.layer_with(RequestLogConfig::new().with_sink(NoopSink));
//! assert!(layer.is_some());
//! ```

use axum::{body::Body, extract::Request, response::Response};
use bytes::Bytes;
use http_body_util::BodyExt;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{BoxError, Layer, Service};
use tracing::error;

pub mod config;
pub use config::{RequestLogConfig, RequestLogger};

pub mod filter;
pub use filter::{BodyFilter, HeadersFilter, RedactHeaders};

pub mod record;
pub use record::{
    snapshot_headers, HeaderSnapshot, LogContext, LogRecord, RequestRecord, ResponseRecord,
    RouteRecord,
};

pub mod sink;
pub use sink::{LogSink, NoopSink, TracingSink};

/// Prefix of the log line emitted before the downstream handler runs.
pub const RECEIVED_REQUEST_PREFIX: &str = "Received request:";

/// Prefix of the log line emitted after the downstream handler returns.
pub const SENT_RESPONSE_PREFIX: &str = "Sent response:";

/// Errors surfaced through the service's `BoxError` channel.
///
/// A body that cannot be read is fatal for the request: the interceptor
/// does not retry or suppress it, and the surrounding runtime's
/// failure-to-response mapping (e.g. axum's `HandleErrorLayer`) decides
/// what the client sees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The inbound request body stream failed while being copied.
    #[error("failed to read request body: {0}")]
    RequestBodyRead(#[source] axum::Error),
    /// The response body stream failed while being copied.
    #[error("failed to read response body: {0}")]
    ResponseBodyRead(#[source] axum::Error),
}

/// Tower layer wrapping handlers with the logging interceptor.
///
/// Derived from a [`RequestLogger`]; holds the base and the resolved
/// override configuration, both consulted at request time. Immutable
/// after construction and safe to share across concurrently in-flight
/// requests.
#[derive(Clone, Debug)]
pub struct RequestLogLayer {
    base: Arc<RequestLogConfig>,
    pub(crate) overrides: Arc<RequestLogConfig>,
}

impl RequestLogLayer {
    pub(crate) fn from_parts(
        base: Arc<RequestLogConfig>,
        overrides: Arc<RequestLogConfig>,
    ) -> Self {
        Self { base, overrides }
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService {
            inner,
            base: Arc::clone(&self.base),
            overrides: Arc::clone(&self.overrides),
        }
    }
}

/// Tower service that performs the two-stage logging protocol around the
/// inner service.
///
/// Created by [`RequestLogLayer`]; users don't interact with this type
/// directly. Per-request state is freshly allocated on every call, so one
/// instance serves any number of concurrent requests without locking.
#[derive(Clone, Debug)]
pub struct RequestLogService<S> {
    inner: S,
    base: Arc<RequestLogConfig>,
    overrides: Arc<RequestLogConfig>,
}

impl<S> Service<Request> for RequestLogService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The instance polled ready must serve this call; hand it to the
        // future and keep the fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let base = Arc::clone(&self.base);
        let overrides = Arc::clone(&self.overrides);

        Box::pin(async move {
            // No sink or disabled: just run the handler.
            let effective_sink = overrides.sink.clone().filter(|_| !overrides.disabled);
            let Some(sink) = effective_sink else {
                return inner.call(request).await.map_err(Into::into);
            };

            let cx = LogContext::from_request(&request);

            let (parts, body) = request.into_parts();
            let body_bytes = body
                .collect()
                .await
                .map_err(Error::RequestBodyRead)?
                .to_bytes();

            let request_record = RequestRecord {
                route: RouteRecord::from_context(&cx),
                headers: filter_headers(&base, &overrides, &cx, &parts.headers),
                body: logged_body(filter_body(&base, &overrides, &cx, body_bytes.clone())),
            };
            emit(
                sink.as_ref(),
                &cx,
                RECEIVED_REQUEST_PREFIX,
                &LogRecord {
                    request: &request_record,
                    response: None,
                },
            );

            let request = Request::from_parts(parts, Body::from(body_bytes));
            let response = inner.call(request).await.map_err(Into::into)?;

            let (parts, body) = response.into_parts();
            let body_bytes = body
                .collect()
                .await
                .map_err(Error::ResponseBodyRead)?
                .to_bytes();

            let response_record = ResponseRecord {
                status: parts.status.as_u16(),
                headers: filter_headers(&base, &overrides, &cx, &parts.headers),
                body: logged_body(filter_body(&base, &overrides, &cx, body_bytes.clone())),
            };
            emit(
                sink.as_ref(),
                &cx,
                SENT_RESPONSE_PREFIX,
                &LogRecord {
                    request: &request_record,
                    response: Some(&response_record),
                },
            );

            Ok(Response::from_parts(parts, Body::from(body_bytes)))
        })
    }
}

/// Applies the effective body filter: the override's if set, otherwise
/// the base one, otherwise identity.
fn filter_body(
    base: &RequestLogConfig,
    overrides: &RequestLogConfig,
    cx: &LogContext,
    body: Bytes,
) -> Bytes {
    if let Some(filter) = &overrides.body_filter {
        filter.filter_body(cx, body)
    } else if let Some(filter) = &base.body_filter {
        filter.filter_body(cx, body)
    } else {
        body
    }
}

/// Deep-copies the live headers, then applies the effective headers
/// filter under the same precedence as [`filter_body`].
fn filter_headers(
    base: &RequestLogConfig,
    overrides: &RequestLogConfig,
    cx: &LogContext,
    headers: &axum::http::HeaderMap,
) -> HeaderSnapshot {
    let snapshot = snapshot_headers(headers);
    if let Some(filter) = &overrides.headers_filter {
        filter.filter_headers(cx, snapshot)
    } else if let Some(filter) = &base.headers_filter {
        filter.filter_headers(cx, snapshot)
    } else {
        snapshot
    }
}

fn logged_body(body: Bytes) -> String {
    String::from_utf8_lossy(&body).into_owned()
}

/// Serializes the record compactly and hands it to the sink. Encoding
/// failures never reach the request path.
fn emit(sink: &dyn LogSink, cx: &LogContext, prefix: &str, record: &LogRecord<'_>) {
    match serde_json::to_string(record) {
        Ok(json) => sink.log_debug(cx, prefix, json.trim()),
        Err(err) => error!(error = %err, "failed to encode request log record"),
    }
}
