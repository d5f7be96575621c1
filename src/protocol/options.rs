//! Request options and the precedence-aware option merger.
//!
//! Options flow through three merges before a request is sent:
//!
//! ```text
//! global defaults ─┐
//!                  ├─ merge ─┐
//! route overrides ─┘         ├─ merge ─► request
//!          per-name / call ──┘
//! ```
//!
//! Every field except `headers` is replaced whole by the later source. Header
//! maps are combined key by key, later source winning. A [`HeaderSource::Computed`]
//! is evaluated at merge time, so a token read from a closure is always current
//! at the moment a request is prepared.
//!
//! # Examples
//!
//! ```
//! use router_fetch::protocol::{merge, RequestOptions};
//!
//! let base = RequestOptions::new().with_method("GET").with_header("a", "1");
//! let over = RequestOptions::new().with_header("b", "2");
//!
//! let merged = merge(Some(&base), Some(&over));
//! assert_eq!(merged.method.as_deref(), Some("GET"));
//! assert_eq!(merged.resolved_headers().len(), 2);
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Header name to value, case preserved as declared.
pub type Headers = BTreeMap<String, String>;

/// Where a set of headers comes from.
#[derive(Clone)]
pub enum HeaderSource {
    /// A fixed header map.
    Static(Headers),
    /// A function evaluated each time options are merged.
    Computed(Arc<dyn Fn() -> Headers + Send + Sync>),
}

impl HeaderSource {
    /// A computed header source.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> Headers + Send + Sync + 'static,
    {
        HeaderSource::Computed(Arc::new(f))
    }

    /// Produce the header map, invoking the function for computed sources.
    pub fn resolve(&self) -> Headers {
        match self {
            HeaderSource::Static(headers) => headers.clone(),
            HeaderSource::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for HeaderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderSource::Static(headers) => f.debug_tuple("Static").field(headers).finish(),
            HeaderSource::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<Headers> for HeaderSource {
    fn from(headers: Headers) -> Self {
        HeaderSource::Static(headers)
    }
}

/// Request configuration: global defaults, route overrides, or call-site options.
///
/// All fields are optional so that any source can leave a field to an earlier one.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method, e.g. `"GET"`. Custom methods are passed through as-is.
    pub method: Option<String>,
    /// Header source, merged key by key.
    pub headers: Option<HeaderSource>,
    /// Pre-encoded request body.
    pub body: Option<String>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Pass-through options handed to the transport untouched.
    pub extra: BTreeMap<String, Value>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add one header.
    ///
    /// On a computed source the header is layered on top of whatever the
    /// function returns.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.headers = Some(match self.headers.take() {
            None => HeaderSource::Static(Headers::from([(name, value)])),
            Some(HeaderSource::Static(mut headers)) => {
                headers.insert(name, value);
                HeaderSource::Static(headers)
            }
            Some(HeaderSource::Computed(f)) => HeaderSource::computed(move || {
                let mut headers = f();
                headers.insert(name.clone(), value.clone());
                headers
            }),
        });
        self
    }

    /// Replace the header source with a fixed map.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(HeaderSource::Static(headers));
        self
    }

    /// Replace the header source with a function evaluated at merge time.
    pub fn with_computed_headers<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Headers + Send + Sync + 'static,
    {
        self.headers = Some(HeaderSource::computed(f));
        self
    }

    /// Set a pre-encoded body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a pass-through option.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Headers as a concrete map, evaluating a computed source.
    pub fn resolved_headers(&self) -> Headers {
        self.headers.as_ref().map(HeaderSource::resolve).unwrap_or_default()
    }

    /// Shorthand for `merge(Some(self), Some(other))`.
    pub fn merged_with(&self, other: &RequestOptions) -> RequestOptions {
        merge(Some(self), Some(other))
    }
}

/// Merge two option sources, `over` taking precedence.
///
/// Absent sources count as empty. Neither input is modified. The result always
/// carries a static header map (possibly empty), so computed sources have been
/// evaluated exactly once by the time this returns.
pub fn merge(base: Option<&RequestOptions>, over: Option<&RequestOptions>) -> RequestOptions {
    let empty = RequestOptions::default();
    let base = base.unwrap_or(&empty);
    let over = over.unwrap_or(&empty);

    let mut headers = base.resolved_headers();
    headers.extend(over.resolved_headers());

    let mut extra = base.extra.clone();
    extra.extend(over.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

    RequestOptions {
        method: over.method.clone().or_else(|| base.method.clone()),
        headers: Some(HeaderSource::Static(headers)),
        body: over.body.clone().or_else(|| base.body.clone()),
        timeout: over.timeout.or(base.timeout),
        extra,
    }
}
