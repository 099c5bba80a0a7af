//! Configuration model and wrapper derivation.
//!
//! One [`RequestLogger`] is built at startup with the process-wide base
//! configuration. For each route (or wherever else a wrapper is
//! composed), [`RequestLogger::layer`] or [`RequestLogger::layer_with`]
//! derives a [`RequestLogLayer`] from the base plus an optional,
//! consumed-once override. The base configuration is never mutated by a
//! derivation.

use std::fmt;
use std::sync::Arc;

use crate::filter::{BodyFilter, HeadersFilter};
use crate::sink::{LogSink, TracingSink};
use crate::RequestLogLayer;

/// Configuration for the logging interceptor.
///
/// Used both as the process-wide base configuration (via
/// [`RequestLogger::new`]) and as a per-derivation override (via
/// [`RequestLogger::layer_with`]). All fields default to unset.
///
/// # Examples
///
/// ```rust
/// use reqlog::{RedactHeaders, RequestLogConfig, RequestLogger};
///
/// let logger = RequestLogger::new(
///     RequestLogConfig::new().with_headers_filter(RedactHeaders::default()),
/// );
/// let layer = logger.layer();
/// ```
#[derive(Clone, Default)]
pub struct RequestLogConfig {
    /// Transform applied to copied body bytes before logging.
    pub body_filter: Option<Arc<dyn BodyFilter>>,
    /// Transform applied to the copied header map before logging.
    pub headers_filter: Option<Arc<dyn HeadersFilter>>,
    /// Destination for the log lines. [`RequestLogger::new`] installs
    /// [`TracingSink`] when the base configuration leaves this unset; an
    /// override with no sink disables logging for that wrapper.
    pub sink: Option<Arc<dyn LogSink>>,
    /// When set on an override, derivation yields no wrapper at all.
    pub disabled: bool,
}

impl RequestLogConfig {
    /// An empty configuration, identical to `Default::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body filter.
    pub fn with_body_filter<F: BodyFilter + 'static>(mut self, filter: F) -> Self {
        self.body_filter = Some(Arc::new(filter));
        self
    }

    /// Sets the headers filter.
    pub fn with_headers_filter<F: HeadersFilter + 'static>(mut self, filter: F) -> Self {
        self.headers_filter = Some(Arc::new(filter));
        self
    }

    /// Sets the log sink.
    pub fn with_sink<S: LogSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Marks this configuration as disabled.
    pub fn disable(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl fmt::Debug for RequestLogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogConfig")
            .field("body_filter", &self.body_filter.is_some())
            .field("headers_filter", &self.headers_filter.is_some())
            .field("sink", &self.sink.is_some())
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Factory for logging wrappers, bound to the process-wide base
/// configuration.
///
/// Build one at startup and thread it to wherever routes are composed;
/// there is no hidden global. Cloning is cheap and shares the base
/// configuration.
#[derive(Clone, Debug)]
pub struct RequestLogger {
    base: Arc<RequestLogConfig>,
}

impl RequestLogger {
    /// Creates the factory, installing [`TracingSink`] as the sink if the
    /// base configuration does not name one.
    pub fn new(mut config: RequestLogConfig) -> Self {
        if config.sink.is_none() {
            config.sink = Some(Arc::new(TracingSink));
        }
        Self {
            base: Arc::new(config),
        }
    }

    /// The base configuration this factory was built with.
    ///
    /// Useful for re-threading the base sink into an explicit override,
    /// since an override replaces the sink wholesale.
    pub fn config(&self) -> &RequestLogConfig {
        &self.base
    }

    /// Derives a wrapper with no override.
    ///
    /// The synthesized override carries only the base sink: filters
    /// default to "none" unless an explicit override sets them.
    pub fn layer(&self) -> RequestLogLayer {
        let overrides = RequestLogConfig {
            sink: self.base.sink.clone(),
            ..RequestLogConfig::default()
        };
        RequestLogLayer::from_parts(Arc::clone(&self.base), Arc::new(overrides))
    }

    /// Derives a wrapper with an explicit override.
    ///
    /// Returns `None` when the override is disabled: the caller must
    /// treat that as "do not intercept" and compose the downstream
    /// handler unwrapped (e.g. via `tower::util::option_layer`). The
    /// override is consumed as-is; in particular, an override without a
    /// sink produces a wrapper that performs no logging at all.
    pub fn layer_with(&self, overrides: RequestLogConfig) -> Option<RequestLogLayer> {
        if overrides.disabled {
            return None;
        }
        Some(RequestLogLayer::from_parts(
            Arc::clone(&self.base),
            Arc::new(overrides),
        ))
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new(RequestLogConfig::default())
    }
}
