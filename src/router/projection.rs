//! Read projection over a route's state and actions.

use crate::client::{ActionRegistry, ActionResult, ActionSet, FetchAction, FetchResponse};
use crate::error::{FetchError, Result};
use crate::protocol::RequestOptions;
use crate::state::{Observable, StateSlot, StateStore};
use crate::types::{Route, RouteKey};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Everything a view needs for the current route, resolved at call time.
///
/// The cells are live handles into the store, not snapshots: reading them
/// later sees later writes. Fields are `None` when the guard has not yet
/// initialized the route.
#[derive(Clone)]
pub struct RouteFetchView {
    /// Key the view was resolved against.
    pub key: RouteKey,
    /// Decoded data cells.
    pub data: Option<StateSlot<Option<Value>>>,
    /// In-flight flags.
    pub fetching: Option<StateSlot<bool>>,
    /// Raw response cells.
    pub response: Option<StateSlot<Option<FetchResponse>>>,
    /// Combined in-flight flag for the route's aggregate fetch.
    pub pending: Option<Observable<bool>>,
    /// The route's fetch trigger; `None` if it declares none.
    pub fetch: Option<FetchAction>,
    actions: Option<Arc<ActionSet>>,
}

impl RouteFetchView {
    pub(crate) fn resolve(store: &StateStore, actions: &ActionRegistry, route: &Route) -> Self {
        let key = route.key();
        let state = store.get(&key);
        let set = actions.get(&key);

        Self {
            data: state.as_deref().map(|s| s.data.clone()),
            fetching: state.as_deref().map(|s| s.fetching.clone()),
            response: state.as_deref().map(|s| s.response.clone()),
            pending: state.as_deref().map(|s| s.pending.clone()),
            fetch: set.as_ref().and_then(|set| set.fetch.clone()),
            actions: set,
            key,
        }
    }

    /// Whether the guard has initialized this route.
    pub fn is_ready(&self) -> bool {
        self.data.is_some()
    }

    /// The route's action set, if built.
    pub fn actions(&self) -> Option<&ActionSet> {
        self.actions.as_deref()
    }

    fn set(&self) -> Result<&ActionSet> {
        self.actions
            .as_deref()
            .ok_or_else(|| FetchError::Uninitialized(self.key.clone()))
    }

    /// `GET url` with the current route's parameters.
    pub async fn get(&self, url: &str, options: Option<RequestOptions>) -> Result<ActionResult> {
        self.set()?.get(url, options).await
    }

    /// `DELETE url` with the current route's parameters.
    pub async fn del(&self, url: &str, options: Option<RequestOptions>) -> Result<ActionResult> {
        self.set()?.del(url, options).await
    }

    /// `POST url` with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.set()?.post(url, body, options).await
    }

    /// `PUT url` with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.set()?.put(url, body, options).await
    }

    /// `PATCH url` with a JSON body.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<ActionResult> {
        self.set()?.patch(url, body, options).await
    }
}
