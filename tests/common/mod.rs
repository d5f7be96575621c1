//! Shared fixtures: an in-memory router and a scriptable transport.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use router_fetch::client::{FetchResponse, HttpRequest, Transport};
use router_fetch::{FetchError, FetchGuard, NavigationHooks, Result, Route, RouteMeta};
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;

/// Transport that records every request and answers from a script.
///
/// Unscripted URLs answer `200 {"url": <url>}`. A held URL blocks until the
/// test releases it through the returned sender.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<HttpRequest>>,
    replies: Mutex<HashMap<String, (u16, String)>>,
    failures: Mutex<HashMap<String, String>>,
    held: Mutex<HashMap<String, VecDeque<oneshot::Receiver<FetchResponse>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body` from now on.
    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .insert(url.to_string(), (status, body.to_string()));
    }

    /// Fail every request to `url` with a network error.
    pub fn fail(&self, url: &str, message: &str) {
        self.failures
            .lock()
            .insert(url.to_string(), message.to_string());
    }

    /// Hold the next request to `url` until a response is sent on the returned channel.
    pub fn hold(&self, url: &str) -> oneshot::Sender<FetchResponse> {
        let (tx, rx) = oneshot::channel();
        self.held
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<FetchResponse> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        let held = self.held.lock().get_mut(&url).and_then(VecDeque::pop_front);
        if let Some(rx) = held {
            return rx
                .await
                .map(|response| response.with_url(url))
                .map_err(|_| FetchError::Http("held request dropped".into()));
        }

        let failure = self.failures.lock().get(&url).cloned();
        if let Some(message) = failure {
            return Err(FetchError::Http(message));
        }

        let reply = self.replies.lock().get(&url).cloned();
        let response = match reply {
            Some((status, body)) => FetchResponse::new(status, body),
            None => FetchResponse::new(200, serde_json::json!({ "url": url }).to_string()),
        };
        Ok(response.with_url(url))
    }
}

/// A minimal pattern-matching router that runs guards before committing.
#[derive(Default)]
pub struct MemoryRouter {
    routes: Vec<(String, RouteMeta)>,
    guards: Vec<FetchGuard>,
    current: Option<Route>,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, meta: RouteMeta) -> Self {
        self.routes.push((pattern.to_string(), meta));
        self
    }

    /// Match `location` against the declared patterns, first match wins.
    pub fn resolve(&self, location: &str) -> Route {
        let (path, query) = location.split_once('?').unwrap_or((location, ""));

        let mut route = Route::new(path);
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            route = route.with_query(name, value);
        }

        for (pattern, meta) in &self.routes {
            if let Some(params) = match_pattern(pattern, path) {
                route.matched.push(router_fetch::RouteRecord::new(pattern.clone()));
                route.params = params;
                route.meta = meta.clone();
                break;
            }
        }
        route
    }

    /// Navigate to `location`, running every guard first.
    pub async fn push(&mut self, location: &str) -> Result<Route> {
        let route = self.resolve(location);
        for guard in &self.guards {
            guard.before_each(&route).await?;
        }
        self.current = Some(route.clone());
        Ok(route)
    }

    pub fn current(&self) -> Option<&Route> {
        self.current.as_ref()
    }
}

impl NavigationHooks for MemoryRouter {
    fn before_each(&mut self, guard: FetchGuard) {
        self.guards.push(guard);
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<router_fetch::RouteParams> {
    let pattern: Vec<&str> = pattern.split('/').collect();
    let path: Vec<&str> = path.split('/').collect();
    if pattern.len() != path.len() {
        return None;
    }

    let mut params = router_fetch::RouteParams::new();
    for (expected, actual) in pattern.iter().zip(&path) {
        match expected.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), actual.to_string());
            }
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}

/// Route meta declaring only a fetch spec.
pub fn fetch_meta(spec: router_fetch::FetchSpec) -> RouteMeta {
    RouteMeta {
        fetch: Some(spec),
        fetch_options: None,
    }
}
