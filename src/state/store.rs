//! Per-route reactive state.
//!
//! This module holds the fetched data for every route that has been entered.
//! Each route key maps to a [`RouteState`] with three observable fields:
//! `data`, `fetching` and `response`. Each field is a single cell or a map of
//! named cells, depending on the route's [`FetchSpec`] shape.
//!
//! # Lifecycle
//!
//! Route state is created lazily on first navigation and then lives as long as
//! the [`StateStore`]. Re-entering a route reuses the same cells, so anything
//! subscribed to them keeps observing across navigations.

use crate::client::FetchResponse;
use crate::error::{FetchError, Result};
use crate::state::observable::Observable;
use crate::types::{FetchSpec, RouteKey};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One state field: a single cell, or one cell per named fetch.
#[derive(Debug)]
pub enum StateSlot<T> {
    /// Field of a single-fetch route.
    Single(Observable<T>),
    /// Field of a named-fetch route.
    Named(BTreeMap<String, Observable<T>>),
}

impl<T> StateSlot<T> {
    fn for_spec(spec: &FetchSpec, init: impl Fn() -> T) -> Self {
        match spec {
            FetchSpec::Single(_) => StateSlot::Single(Observable::new(init())),
            FetchSpec::Named(entries) => StateSlot::Named(
                entries
                    .keys()
                    .map(|name| (name.clone(), Observable::new(init())))
                    .collect(),
            ),
        }
    }

    /// The cell for a slot: `None` addresses the single cell, `Some(name)` a named one.
    pub fn cell(&self, name: Option<&str>) -> Option<&Observable<T>> {
        match (self, name) {
            (StateSlot::Single(cell), None) => Some(cell),
            (StateSlot::Named(cells), Some(name)) => cells.get(name),
            _ => None,
        }
    }

    /// The single cell, if this is a single-fetch field.
    pub fn single(&self) -> Option<&Observable<T>> {
        self.cell(None)
    }

    /// A named cell, if this is a named-fetch field declaring `name`.
    pub fn named(&self, name: &str) -> Option<&Observable<T>> {
        self.cell(Some(name))
    }

    /// Declared names; empty for a single-fetch field.
    pub fn names(&self) -> Vec<&str> {
        match self {
            StateSlot::Single(_) => Vec::new(),
            StateSlot::Named(cells) => cells.keys().map(String::as_str).collect(),
        }
    }
}

impl<T: Clone> StateSlot<T> {
    /// Current value of the single cell.
    pub fn get(&self) -> Option<T> {
        self.single().map(Observable::get)
    }

    /// Current value of a named cell.
    pub fn get_named(&self, name: &str) -> Option<T> {
        self.named(name).map(Observable::get)
    }
}

impl<T> Clone for StateSlot<T> {
    fn clone(&self) -> Self {
        match self {
            StateSlot::Single(cell) => StateSlot::Single(cell.clone()),
            StateSlot::Named(cells) => StateSlot::Named(cells.clone()),
        }
    }
}

/// A value destined for one [`RouteState`] field.
#[derive(Debug, Clone)]
pub enum StateValue {
    /// Decoded body or resolver output.
    Data(Option<Value>),
    /// In-flight flag.
    Fetching(bool),
    /// Raw response of the last completed call.
    Response(Option<FetchResponse>),
}

impl StateValue {
    fn field(&self) -> &'static str {
        match self {
            StateValue::Data(_) => "data",
            StateValue::Fetching(_) => "fetching",
            StateValue::Response(_) => "response",
        }
    }
}

/// Reactive record for one route key.
#[derive(Debug)]
pub struct RouteState {
    /// Last successfully decoded body (or resolver result), per slot.
    pub data: StateSlot<Option<Value>>,
    /// Whether a fetch is in flight, per slot.
    pub fetching: StateSlot<bool>,
    /// Raw response of the last completed URL fetch, per slot.
    pub response: StateSlot<Option<FetchResponse>>,
    /// True from the start of an aggregate run until every fetch in it, and
    /// in any overlapping run, has settled.
    pub pending: Observable<bool>,
    running: AtomicUsize,
    generations: Mutex<HashMap<Option<String>, u64>>,
}

impl RouteState {
    fn new(spec: &FetchSpec) -> Self {
        Self {
            data: StateSlot::for_spec(spec, || None),
            fetching: StateSlot::for_spec(spec, || false),
            response: StateSlot::for_spec(spec, || None),
            pending: Observable::new(false),
            running: AtomicUsize::new(0),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Whether this record was allocated for a named spec.
    pub fn is_named(&self) -> bool {
        matches!(self.data, StateSlot::Named(_))
    }

    /// Start a new generation for a slot and return it.
    pub(crate) fn begin_generation(&self, name: Option<&str>) -> u64 {
        let mut generations = self.generations.lock();
        let generation = generations.entry(name.map(str::to_string)).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Whether `generation` is still the latest for a slot.
    pub(crate) fn is_current(&self, name: Option<&str>, generation: u64) -> bool {
        let generations = self.generations.lock();
        generations.get(&name.map(str::to_string)).copied() == Some(generation)
    }

    /// Mark an aggregate run as started. The run ends when the returned guard
    /// is dropped, whether the run completed or was cancelled.
    pub(crate) fn begin_run(self: &Arc<Self>) -> RunGuard {
        self.running.fetch_add(1, Ordering::SeqCst);
        self.pending.set(true);
        RunGuard {
            state: Arc::clone(self),
        }
    }

    /// Clears `pending` once no run remains.
    fn end_run(&self) {
        if self.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.pending.set(false);
        }
    }
}

/// An in-progress aggregate run on a [`RouteState`].
#[must_use = "the run ends as soon as the guard is dropped"]
pub(crate) struct RunGuard {
    state: Arc<RouteState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.end_run();
    }
}

/// Registry of route state, keyed by [`RouteKey`].
///
/// Cloning creates a new handle to the same underlying records.
///
/// # Examples
///
/// ```
/// use router_fetch::{FetchSpec, RouteKey, StateStore};
///
/// let store = StateStore::new();
/// let key = RouteKey::from("/foos/:id");
/// let spec = FetchSpec::url("https://api.example.com/foos/:id");
///
/// let first = store.init_state(&key, &spec);
/// let again = store.init_state(&key, &spec);
/// assert!(std::sync::Arc::ptr_eq(&first, &again));
/// ```
#[derive(Clone, Default)]
pub struct StateStore {
    routes: Arc<RwLock<HashMap<RouteKey, Arc<RouteState>>>>,
}

impl StateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the state for `key`.
    ///
    /// An existing record is returned unchanged even if `spec` now has a
    /// different shape.
    pub fn init_state(&self, key: &RouteKey, spec: &FetchSpec) -> Arc<RouteState> {
        let mut routes = self.routes.write();

        routes
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::trace!(route_key = %key, named = spec.is_named(), "initializing route state");
                Arc::new(RouteState::new(spec))
            })
            .clone()
    }

    /// Get existing state without creating it.
    pub fn get(&self, key: &RouteKey) -> Option<Arc<RouteState>> {
        self.routes.read().get(key).cloned()
    }

    /// Keys with initialized state, in arbitrary order.
    pub fn keys(&self) -> Vec<RouteKey> {
        self.routes.read().keys().cloned().collect()
    }

    /// Write one field of a route's state.
    ///
    /// `name` selects the named cell; pass `None` for single-fetch routes.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Uninitialized`] if `key` has no state.
    /// - [`FetchError::UnknownFetch`] if `name` does not address a cell of the
    ///   route's shape.
    pub fn set_state(&self, key: &RouteKey, name: Option<&str>, value: StateValue) -> Result<()> {
        let state = self
            .get(key)
            .ok_or_else(|| FetchError::Uninitialized(key.clone()))?;

        tracing::trace!(route_key = %key, name, field = value.field(), "writing route state");

        let unknown = || FetchError::UnknownFetch {
            key: key.clone(),
            name: name.unwrap_or_default().to_string(),
        };

        match value {
            StateValue::Data(v) => state.data.cell(name).ok_or_else(unknown)?.set(v),
            StateValue::Fetching(v) => state.fetching.cell(name).ok_or_else(unknown)?.set(v),
            StateValue::Response(v) => state.response.cell(name).ok_or_else(unknown)?.set(v),
        }

        Ok(())
    }
}
