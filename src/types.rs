//! Core route and fetch-specification types.
//!
//! A [`Route`] is the router's description of a navigation target: the concrete
//! path, the extracted parameters, the chain of matched route records, and the
//! route's [`RouteMeta`]. The meta carries the declarative [`FetchSpec`] that
//! tells the guard what to load when the route is entered.
//!
//! # Fetch shapes
//!
//! | Shape | Constructor | State layout |
//! |-------|-------------|--------------|
//! | Single URL | [`FetchSpec::url`] | one cell per field |
//! | Single resolver | [`FetchSpec::resolver`] | one cell per field |
//! | Named | [`FetchSpec::named`] | one cell per field per name |
//!
//! The shape is chosen once, when the route is declared, and never inspected
//! again at runtime beyond matching on the variant.
//!
//! # Examples
//!
//! ```
//! use router_fetch::{FetchSpec, Route, SingleSpec};
//!
//! let route = Route::new("/foos/42")
//!     .with_matched("/foos/:id")
//!     .with_param("id", "42")
//!     .with_fetch(FetchSpec::url("https://api.example.com/foos/:id"));
//!
//! assert_eq!(route.key().as_str(), "/foos/:id");
//!
//! let home = FetchSpec::named([
//!     ("foos", SingleSpec::url("https://api.example.com/foos")),
//!     ("bars", SingleSpec::url("https://api.example.com/bars")),
//! ]);
//! assert!(home.is_named());
//! ```

use crate::protocol::RequestOptions;
use futures::future::BoxFuture;
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Route parameters extracted by the router, by name.
pub type RouteParams = BTreeMap<String, String>;

/// A custom resolver: receives the route being entered and yields the data to store.
pub type Resolver = Arc<dyn Fn(Route) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Stable identity of a route, taken from its last matched path pattern.
///
/// Navigations to `/foos/1` and `/foos/2` both match `/foos/:id` and therefore
/// share one key, one state record and one action set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey(String);

impl RouteKey {
    /// Create a key from a route pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        RouteKey(pattern.into())
    }

    /// The underlying pattern.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RouteKey {
    fn from(s: &str) -> Self {
        RouteKey(s.to_string())
    }
}

impl From<String> for RouteKey {
    fn from(s: String) -> Self {
        RouteKey(s)
    }
}

impl Borrow<str> for RouteKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One record in the router's match chain (outermost first).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteRecord {
    /// Path pattern as declared, e.g. `/foos/:id`.
    pub path: String,
    /// Optional route name.
    pub name: Option<String>,
}

impl RouteRecord {
    /// Create an unnamed record for a pattern.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    /// Attach a route name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A navigation target as seen by the guard and the read projection.
#[derive(Debug, Clone, Default)]
pub struct Route {
    /// Concrete path being navigated to, e.g. `/foos/42`.
    pub path: String,
    /// Parameters extracted from the path.
    pub params: RouteParams,
    /// Query string parameters.
    pub query: BTreeMap<String, String>,
    /// Matched records, outermost first. The last one identifies the route.
    pub matched: Vec<RouteRecord>,
    /// Fetch declarations for this route.
    pub meta: RouteMeta,
}

impl Route {
    /// Create a route for a concrete path with no matches or meta.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Append a matched record for the given pattern.
    pub fn with_matched(mut self, pattern: impl Into<String>) -> Self {
        self.matched.push(RouteRecord::new(pattern));
        self
    }

    /// Add a path parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Declare what to fetch when this route is entered.
    pub fn with_fetch(mut self, spec: FetchSpec) -> Self {
        self.meta.fetch = Some(spec);
        self
    }

    /// Declare request option overrides for this route's fetches.
    pub fn with_fetch_options(mut self, options: RouteFetchOptions) -> Self {
        self.meta.fetch_options = Some(options);
        self
    }

    /// The route's identity: the last matched pattern.
    ///
    /// Routes built without a router have no matched records; their concrete
    /// path is used instead.
    pub fn key(&self) -> RouteKey {
        match self.matched.last() {
            Some(record) => RouteKey::new(record.path.clone()),
            None => RouteKey::new(self.path.clone()),
        }
    }
}

/// Route meta fields consumed by the plugin.
#[derive(Debug, Clone, Default)]
pub struct RouteMeta {
    /// What to fetch on entry. `None` makes the guard a no-op for this route.
    pub fetch: Option<FetchSpec>,
    /// Per-route (or per-name) request option overrides.
    pub fetch_options: Option<RouteFetchOptions>,
}

/// Declarative description of a route's data needs.
#[derive(Clone)]
pub enum FetchSpec {
    /// One fetch whose results live directly in the route's state cells.
    Single(SingleSpec),
    /// Independent fetches, each tracked under its own name.
    Named(BTreeMap<String, SingleSpec>),
}

impl FetchSpec {
    /// A single URL template fetch.
    pub fn url(template: impl Into<String>) -> Self {
        FetchSpec::Single(SingleSpec::url(template))
    }

    /// A single custom resolver fetch.
    pub fn resolver<F, Fut>(f: F) -> Self
    where
        F: Fn(Route) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        FetchSpec::Single(SingleSpec::resolver(f))
    }

    /// A named group of fetches.
    pub fn named<I, K, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<SingleSpec>,
    {
        FetchSpec::Named(
            entries
                .into_iter()
                .map(|(name, spec)| (name.into(), spec.into()))
                .collect(),
        )
    }

    /// Whether this spec is the named shape.
    pub fn is_named(&self) -> bool {
        matches!(self, FetchSpec::Named(_))
    }

    /// Names declared by a named spec; empty for a single spec.
    pub fn names(&self) -> Vec<&str> {
        match self {
            FetchSpec::Single(_) => Vec::new(),
            FetchSpec::Named(entries) => entries.keys().map(String::as_str).collect(),
        }
    }
}

impl fmt::Debug for FetchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchSpec::Single(spec) => f.debug_tuple("Single").field(spec).finish(),
            FetchSpec::Named(entries) => f.debug_tuple("Named").field(entries).finish(),
        }
    }
}

impl From<&str> for FetchSpec {
    fn from(template: &str) -> Self {
        FetchSpec::url(template)
    }
}

impl From<String> for FetchSpec {
    fn from(template: String) -> Self {
        FetchSpec::url(template)
    }
}

/// One fetch: either a URL template or a custom resolver.
#[derive(Clone)]
pub enum SingleSpec {
    /// GET this URL template after substituting route parameters.
    Url(String),
    /// Call this function with the route and store whatever it resolves to.
    Resolver(Resolver),
}

impl SingleSpec {
    /// A URL template.
    pub fn url(template: impl Into<String>) -> Self {
        SingleSpec::Url(template.into())
    }

    /// A custom resolver.
    pub fn resolver<F, Fut>(f: F) -> Self
    where
        F: Fn(Route) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        SingleSpec::Resolver(Arc::new(
            move |route: Route| -> BoxFuture<'static, anyhow::Result<Value>> { Box::pin(f(route)) },
        ))
    }
}

impl fmt::Debug for SingleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleSpec::Url(template) => f.debug_tuple("Url").field(template).finish(),
            SingleSpec::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<&str> for SingleSpec {
    fn from(template: &str) -> Self {
        SingleSpec::url(template)
    }
}

impl From<String> for SingleSpec {
    fn from(template: String) -> Self {
        SingleSpec::url(template)
    }
}

/// Request option overrides declared on a route.
///
/// The shape should follow the route's [`FetchSpec`]: a single spec takes
/// [`RouteFetchOptions::Route`], a named spec takes [`RouteFetchOptions::Named`].
/// A mismatched shape contributes no overrides.
#[derive(Debug, Clone)]
pub enum RouteFetchOptions {
    /// Overrides applied to the route's single fetch.
    Route(RequestOptions),
    /// Overrides applied per named fetch.
    Named(BTreeMap<String, RequestOptions>),
}

impl RouteFetchOptions {
    /// Per-name overrides from `(name, options)` pairs.
    pub fn named<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, RequestOptions)>,
        K: Into<String>,
    {
        RouteFetchOptions::Named(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Overrides that apply to a fetch slot: `None` for the single slot, `Some(name)` for a named one.
    pub fn for_slot(&self, name: Option<&str>) -> Option<&RequestOptions> {
        match (self, name) {
            (RouteFetchOptions::Route(options), None) => Some(options),
            (RouteFetchOptions::Named(entries), Some(name)) => entries.get(name),
            _ => None,
        }
    }
}
