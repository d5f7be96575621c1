//! Fetch triggers and per-route action sets.
//!
//! For every route key the [`ActionRegistry`] holds an [`ActionSet`]: the
//! route's fetch trigger (if it declares a [`FetchSpec`]) plus ad hoc verb
//! helpers.
//!
//! # Trigger lifecycle
//!
//! ```text
//! call()
//!   → fetching = true
//!   → URL:      merge options → resolve template → send → response = raw → decode
//!     Resolver: resolver(route).await
//!   → data = value                  (only on success)
//!   → fetching = false              (always)
//! ```
//!
//! A failed trigger leaves `data` and `response` at their previous values and
//! returns the error to the caller. With
//! [`ClientConfig::fence_stale_responses`](crate::client::ClientConfig) a
//! trigger that has been overtaken by a newer one for the same slot skips all
//! of its remaining writes.
//!
//! # Named fetches
//!
//! A named spec produces one [`FetchTrigger`] per entry, bundled in a
//! [`NamedFetch`]. Each entry can be triggered on its own by name, and
//! [`NamedFetch::call_all`] starts every entry before awaiting any of them.

use crate::client::fetch::{default_options, ActionResult, FetchClient};
use crate::error::{FetchError, Result};
use crate::protocol::{self, RequestOptions};
use crate::state::{RouteState, StateStore, StateValue};
use crate::types::{FetchSpec, Route, RouteKey, RouteParams, SingleSpec};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

struct TriggerInner {
    key: RouteKey,
    name: Option<String>,
    route: Route,
    spec: SingleSpec,
    global: RequestOptions,
    overrides: Option<RequestOptions>,
    store: StateStore,
    client: FetchClient,
}

/// A callable that runs one fetch and records it in route state.
///
/// Cloning is cheap; clones trigger the same fetch.
#[derive(Clone)]
pub struct FetchTrigger {
    inner: Arc<TriggerInner>,
}

impl FetchTrigger {
    /// Name of the slot this trigger writes to; `None` for a single fetch.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Route key this trigger writes to.
    pub fn key(&self) -> &RouteKey {
        &self.inner.key
    }

    /// Run the fetch and return the stored value.
    ///
    /// # Errors
    ///
    /// Network, decode and resolver failures are returned after `fetching`
    /// has been cleared. [`FetchError::Uninitialized`] is returned if the
    /// route's state was never created.
    ///
    /// If the returned future is dropped mid-flight, `fetching` is still
    /// cleared and `data` and `response` keep whatever was last written.
    pub async fn call(&self) -> Result<Value> {
        let inner = &self.inner;
        let name = self.name();
        let state = inner
            .store
            .get(&inner.key)
            .ok_or_else(|| FetchError::Uninitialized(inner.key.clone()))?;

        let generation = state.begin_generation(name);
        inner
            .store
            .set_state(&inner.key, name, StateValue::Fetching(true))?;

        if inner.client.config().enable_logging {
            tracing::debug!(route_key = %inner.key, name, "fetch started");
        }

        let settle = Settle {
            trigger: self,
            state: &state,
            generation,
            done: false,
        };
        let outcome = self.execute(&state, generation).await;
        let cleared = settle.finish();

        if inner.client.config().enable_logging {
            match &outcome {
                Ok(_) => tracing::debug!(route_key = %inner.key, name, "fetch finished"),
                Err(e) => tracing::debug!(route_key = %inner.key, name, error = %e, "fetch failed"),
            }
        }

        let data = outcome?;
        cleared?;
        Ok(data)
    }

    async fn execute(&self, state: &RouteState, generation: u64) -> Result<Value> {
        let inner = &self.inner;

        let data = match &inner.spec {
            SingleSpec::Url(template) => {
                let configured = protocol::merge(Some(&inner.global), inner.overrides.as_ref());
                let options = protocol::merge(
                    Some(&default_options(protocol::constants::DEFAULT_METHOD)),
                    Some(&configured),
                );
                let response = inner
                    .client
                    .send(template, &inner.route.params, options)
                    .await?;
                let decoded = response.json_value();
                self.write(state, generation, StateValue::Response(Some(response)))?;
                decoded?
            }
            SingleSpec::Resolver(resolver) => resolver(inner.route.clone()).await?,
        };

        self.write(state, generation, StateValue::Data(Some(data.clone())))?;
        Ok(data)
    }

    /// Writes through the store unless fencing is on and a newer trigger has
    /// started for this slot.
    fn write(&self, state: &RouteState, generation: u64, value: StateValue) -> Result<()> {
        let inner = &self.inner;
        let name = self.name();
        if inner.client.config().fence_stale_responses && !state.is_current(name, generation) {
            tracing::trace!(route_key = %inner.key, name, generation, "dropping stale write");
            return Ok(());
        }
        inner.store.set_state(&inner.key, name, value)
    }
}

/// Clears a trigger's `fetching` flag exactly once: explicitly through
/// [`Settle::finish`], or on drop if the call's future was cancelled first.
struct Settle<'a> {
    trigger: &'a FetchTrigger,
    state: &'a RouteState,
    generation: u64,
    done: bool,
}

impl Settle<'_> {
    fn finish(mut self) -> Result<()> {
        self.done = true;
        self.trigger
            .write(self.state, self.generation, StateValue::Fetching(false))
    }
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let trigger = &self.trigger.inner;
        if trigger.client.config().enable_logging {
            tracing::debug!(route_key = %trigger.key, name = trigger.name.as_deref(), "fetch cancelled");
        }
        if let Err(e) = self
            .trigger
            .write(self.state, self.generation, StateValue::Fetching(false))
        {
            tracing::warn!(route_key = %trigger.key, error = %e, "failed to clear fetching flag");
        }
    }
}

/// The triggers of a named spec, addressable together or one by one.
#[derive(Clone)]
pub struct NamedFetch {
    key: RouteKey,
    triggers: BTreeMap<String, FetchTrigger>,
}

impl NamedFetch {
    /// The trigger for one name.
    pub fn get(&self, name: &str) -> Option<&FetchTrigger> {
        self.triggers.get(name)
    }

    /// Declared names.
    pub fn names(&self) -> Vec<&str> {
        self.triggers.keys().map(String::as_str).collect()
    }

    /// Run one named fetch in isolation.
    pub async fn call(&self, name: &str) -> Result<Value> {
        let trigger = self.get(name).ok_or_else(|| FetchError::UnknownFetch {
            key: self.key.clone(),
            name: name.to_string(),
        })?;
        trigger.call().await
    }

    /// Run every named fetch concurrently and collect each outcome.
    ///
    /// All fetches are started before any is awaited; completions may arrive
    /// in any order.
    pub async fn call_all(&self) -> Vec<(String, Result<Value>)> {
        let names = self.triggers.keys().cloned();
        let outcomes = join_all(self.triggers.values().map(|trigger| trigger.call())).await;
        names.zip(outcomes).collect()
    }
}

/// A route's fetch trigger, in the shape its spec declared.
#[derive(Clone)]
pub enum FetchAction {
    /// Trigger for a single spec.
    Single(FetchTrigger),
    /// Triggers for a named spec.
    Named(NamedFetch),
}

impl FetchAction {
    /// The trigger for a named entry; `None` for single actions.
    pub fn get(&self, name: &str) -> Option<&FetchTrigger> {
        match self {
            FetchAction::Single(_) => None,
            FetchAction::Named(named) => named.get(name),
        }
    }

    /// Run every declared fetch and wait for all of them to settle.
    ///
    /// The route's `pending` flag is raised before the first fetch starts and
    /// lowered only after the last one has cleared its own `fetching` flag.
    /// Returns the first failure, if any, once everything has settled.
    ///
    /// Dropping the returned future before it completes clears every started
    /// fetch's `fetching` flag and ends the run, so `pending` still settles.
    pub async fn run(&self) -> Result<()> {
        let (store, key) = match self {
            FetchAction::Single(trigger) => (&trigger.inner.store, &trigger.inner.key),
            FetchAction::Named(named) => match named.triggers.values().next() {
                Some(trigger) => (&trigger.inner.store, &named.key),
                None => return Ok(()),
            },
        };
        let state = store
            .get(key)
            .ok_or_else(|| FetchError::Uninitialized(key.clone()))?;

        let _run = state.begin_run();
        let outcome = match self {
            FetchAction::Single(trigger) => trigger.call().await.map(drop),
            FetchAction::Named(named) => named
                .call_all()
                .await
                .into_iter()
                .map(|(_, outcome)| outcome.map(drop))
                .collect::<Result<()>>(),
        };

        outcome
    }
}

/// Ad hoc requests bound to a route's parameters and the global options.
///
/// These bypass the route's [`FetchSpec`] and never write route state.
#[derive(Clone)]
pub struct RouteRequester {
    client: FetchClient,
    global: RequestOptions,
    params: RouteParams,
}

impl RouteRequester {
    pub(crate) fn new(client: FetchClient, global: RequestOptions, params: RouteParams) -> Self {
        Self {
            client,
            global,
            params,
        }
    }

    /// `GET url`.
    pub async fn get(&self, url: &str, options: Option<RequestOptions>) -> Result<ActionResult> {
        self.request("GET", url, None, options).await
    }

    /// `DELETE url`.
    pub async fn del(&self, url: &str, options: Option<RequestOptions>) -> Result<ActionResult> {
        self.request("DELETE", url, None, options).await
    }

    /// `POST url` with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.request("POST", url, Some(encode(body)?), options).await
    }

    /// `PUT url` with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.request("PUT", url, Some(encode(body)?), options).await
    }

    /// `PATCH url` with a JSON body.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.request("PATCH", url, Some(encode(body)?), options).await
    }

    async fn request(
        &self,
        method: &str,
        url: &str,
        body: Option<String>,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        let mut defaults = default_options(method);
        defaults.body = body;

        let configured = protocol::merge(Some(&self.global), options.as_ref());
        let mut merged = protocol::merge(Some(&defaults), Some(&configured));
        merged.method = Some(method.to_string());

        let response = self.client.send(url, &self.params, merged).await?;
        Ok(ActionResult::from_response(response))
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<String> {
    serde_json::to_string(body).map_err(FetchError::Encode)
}

/// Everything callable for one route: its fetch trigger and verb helpers.
#[derive(Clone)]
pub struct ActionSet {
    /// Trigger for the route's declared fetches; `None` if it declares none.
    pub fetch: Option<FetchAction>,
    requester: RouteRequester,
}

impl ActionSet {
    /// Verb helpers bound to the route this set was built for.
    pub fn requester(&self) -> &RouteRequester {
        &self.requester
    }

    /// See [`RouteRequester::get`].
    pub async fn get(&self, url: &str, options: Option<RequestOptions>) -> Result<ActionResult> {
        self.requester.get(url, options).await
    }

    /// See [`RouteRequester::del`].
    pub async fn del(&self, url: &str, options: Option<RequestOptions>) -> Result<ActionResult> {
        self.requester.del(url, options).await
    }

    /// See [`RouteRequester::post`].
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.requester.post(url, body, options).await
    }

    /// See [`RouteRequester::put`].
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.requester.put(url, body, options).await
    }

    /// See [`RouteRequester::patch`].
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.requester.patch(url, body, options).await
    }
}

/// Registry of action sets, keyed by [`RouteKey`].
///
/// Cloning creates a new handle to the same registry.
#[derive(Clone)]
pub struct ActionRegistry {
    actions: Arc<RwLock<HashMap<RouteKey, Arc<ActionSet>>>>,
    store: StateStore,
    client: FetchClient,
}

impl ActionRegistry {
    /// Create an empty registry whose triggers write to `store` and send through `client`.
    pub fn new(store: StateStore, client: FetchClient) -> Self {
        Self {
            actions: Arc::new(RwLock::new(HashMap::new())),
            store,
            client,
        }
    }

    /// Build the action set for `route` and store it under `key`, replacing
    /// any previous set.
    pub fn init_actions(
        &self,
        key: &RouteKey,
        route: &Route,
        global: &RequestOptions,
    ) -> Arc<ActionSet> {
        let trigger = |name: Option<&str>, spec: &SingleSpec| FetchTrigger {
            inner: Arc::new(TriggerInner {
                key: key.clone(),
                name: name.map(str::to_string),
                route: route.clone(),
                spec: spec.clone(),
                global: global.clone(),
                overrides: route
                    .meta
                    .fetch_options
                    .as_ref()
                    .and_then(|options| options.for_slot(name))
                    .cloned(),
                store: self.store.clone(),
                client: self.client.clone(),
            }),
        };

        let fetch = route.meta.fetch.as_ref().map(|spec| match spec {
            FetchSpec::Single(single) => FetchAction::Single(trigger(None, single)),
            FetchSpec::Named(entries) => FetchAction::Named(NamedFetch {
                key: key.clone(),
                triggers: entries
                    .iter()
                    .map(|(name, single)| (name.clone(), trigger(Some(name), single)))
                    .collect(),
            }),
        });

        let set = Arc::new(ActionSet {
            fetch,
            requester: RouteRequester::new(self.client.clone(), global.clone(), route.params.clone()),
        });

        self.actions.write().insert(key.clone(), Arc::clone(&set));
        set
    }

    /// Get the action set for `key`, if one has been built.
    pub fn get(&self, key: &RouteKey) -> Option<Arc<ActionSet>> {
        self.actions.read().get(key).cloned()
    }

    /// The client used by every action in this registry.
    pub fn client(&self) -> &FetchClient {
        &self.client
    }
}
