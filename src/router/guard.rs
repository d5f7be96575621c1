//! Navigation guard.
//!
//! The router calls [`FetchGuard::before_each`] before completing every
//! navigation. Routes that declare no fetch spec pass straight through;
//! everything else gets its state initialized, its actions rebuilt against
//! the new route, and its fetches started.

use crate::client::{ActionRegistry, NavigationMode};
use crate::error::Result;
use crate::protocol::RequestOptions;
use crate::state::StateStore;
use crate::types::Route;

/// Per-navigation hook that prepares and triggers a route's fetches.
///
/// Cloning is cheap; clones share the same store and registry.
#[derive(Clone)]
pub struct FetchGuard {
    store: StateStore,
    actions: ActionRegistry,
    global: RequestOptions,
    mode: NavigationMode,
}

impl FetchGuard {
    pub(crate) fn new(
        store: StateStore,
        actions: ActionRegistry,
        global: RequestOptions,
        mode: NavigationMode,
    ) -> Self {
        Self {
            store,
            actions,
            global,
            mode,
        }
    }

    /// How this guard treats the fetches it starts.
    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    /// Run the guard for a navigation to `to`.
    ///
    /// In [`NavigationMode::FireAndForget`] the fetch runs on a spawned task
    /// and this returns as soon as it is started; failures are logged at
    /// `warn`. In [`NavigationMode::Await`] this returns once every declared
    /// fetch has settled, with the first failure if any.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn before_each(&self, to: &Route) -> Result<()> {
        let Some(spec) = &to.meta.fetch else {
            return Ok(());
        };

        let key = to.key();
        self.store.init_state(&key, spec);
        let set = self.actions.init_actions(&key, to, &self.global);

        let Some(action) = set.fetch.clone() else {
            return Ok(());
        };

        tracing::debug!(route_key = %key, path = %to.path, mode = ?self.mode, "route fetch triggered");

        match self.mode {
            NavigationMode::FireAndForget => {
                tokio::spawn(async move {
                    if let Err(e) = action.run().await {
                        tracing::warn!(route_key = %key, error = %e, "route fetch failed");
                    }
                });
                Ok(())
            }
            NavigationMode::Await => action.run().await,
        }
    }
}
