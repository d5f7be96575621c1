//! The application-level entry point.

use crate::client::{ActionRegistry, ActionSet, ClientConfig, FetchClient, Transport};
use crate::protocol::RequestOptions;
use crate::router::{FetchGuard, NavigationHooks, RouteFetchView};
use crate::state::{RouteState, StateStore};
use crate::types::{Route, RouteKey};
use std::sync::Arc;

/// Owns the state store, the action registry and the client, and hands out
/// guards and views that share them.
///
/// # Examples
///
/// ```
/// use router_fetch::{RequestOptions, Route, RouterFetch};
///
/// let plugin = RouterFetch::new(RequestOptions::new().with_header("Authorization", "Bearer t"));
/// let view = plugin.use_route_fetch(&Route::new("/"));
/// assert!(!view.is_ready());
/// ```
#[derive(Clone)]
pub struct RouterFetch {
    store: StateStore,
    actions: ActionRegistry,
    global: RequestOptions,
    config: Arc<ClientConfig>,
}

impl RouterFetch {
    /// Create a plugin with default configuration and the given global options.
    pub fn new(global: RequestOptions) -> Self {
        Self::with_config(ClientConfig::default(), global)
    }

    /// Create a plugin backed by reqwest with custom configuration.
    pub fn with_config(config: ClientConfig, global: RequestOptions) -> Self {
        let client = FetchClient::with_config(config.clone());
        Self::from_client(client, config, global)
    }

    /// Create a plugin that sends through a custom transport.
    pub fn with_transport(
        config: ClientConfig,
        global: RequestOptions,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let client = FetchClient::with_transport(config.clone(), transport);
        Self::from_client(client, config, global)
    }

    fn from_client(client: FetchClient, config: ClientConfig, global: RequestOptions) -> Self {
        let store = StateStore::new();
        let actions = ActionRegistry::new(store.clone(), client);
        Self {
            store,
            actions,
            global,
            config: Arc::new(config),
        }
    }

    /// A navigation guard bound to this plugin.
    pub fn guard(&self) -> FetchGuard {
        FetchGuard::new(
            self.store.clone(),
            self.actions.clone(),
            self.global.clone(),
            self.config.navigation,
        )
    }

    /// Register this plugin's guard on `router`.
    pub fn install<R: NavigationHooks + ?Sized>(&self, router: &mut R) {
        router.before_each(self.guard());
    }

    /// Resolve the read projection for `route`.
    pub fn use_route_fetch(&self, route: &Route) -> RouteFetchView {
        RouteFetchView::resolve(&self.store, &self.actions, route)
    }

    /// The state store.
    pub fn state(&self) -> &StateStore {
        &self.store
    }

    /// Raw state for one key.
    pub fn state_for(&self, key: &RouteKey) -> Option<Arc<RouteState>> {
        self.store.get(key)
    }

    /// The action registry.
    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Action set for one key.
    pub fn actions_for(&self, key: &RouteKey) -> Option<Arc<ActionSet>> {
        self.actions.get(key)
    }

    /// The shared fetch client.
    pub fn client(&self) -> &FetchClient {
        self.actions.client()
    }

    /// Global request options applied to every call.
    pub fn global_options(&self) -> &RequestOptions {
        &self.global
    }

    /// The configuration this plugin was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for RouterFetch {
    fn default() -> Self {
        Self::new(RequestOptions::new())
    }
}
