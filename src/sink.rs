//! Log sink abstraction and the built-in implementations.

use tracing::debug;

use crate::record::LogContext;

/// Destination for the per-request log lines.
///
/// The interceptor calls the sink synchronously on the request path, once
/// per stage: the sink must be fast or hand off internally, and it must
/// not panic into the caller. Plain closures implement this trait, which
/// keeps capturing sinks in tests to a one-liner.
pub trait LogSink: Send + Sync {
    /// Accepts one debug-severity log line: a fixed human-readable
    /// `prefix` distinguishing the stage, and the JSON `message`.
    fn log_debug(&self, cx: &LogContext, prefix: &str, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(&LogContext, &str, &str) + Send + Sync,
{
    fn log_debug(&self, cx: &LogContext, prefix: &str, message: &str) {
        self(cx, prefix, message)
    }
}

/// Default sink: emits each line via `tracing::debug!`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log_debug(&self, cx: &LogContext, prefix: &str, message: &str) {
        debug!(
            method = %cx.method(),
            path = cx.uri().path(),
            "{prefix} {message}"
        );
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log_debug(&self, _cx: &LogContext, _prefix: &str, _message: &str) {}
}
