//! Client configuration.

use serde::{Deserialize, Serialize};

/// How the navigation guard treats the fetch it triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    /// Start the fetch on a background task and let navigation complete
    /// immediately. Loading state is visible through the `fetching` cells.
    #[default]
    FireAndForget,
    /// Hold navigation until every declared fetch has settled. The first
    /// failure is returned to the router.
    Await,
}

/// Configuration for the fetch client and the navigation guard.
///
/// # Examples
///
/// ```
/// use router_fetch::client::{ClientConfig, NavigationMode};
///
/// let config = ClientConfig {
///     navigation: NavigationMode::Await,
///     base_url: Some("https://api.example.com/".into()),
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Overall timeout applied to every request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum idle pooled connections kept per host.
    pub max_total_connections: u32,
    /// Proxy used for all requests; empty disables proxying.
    pub proxy_url: String,
    /// Emit tracing events for requests and fetch lifecycles.
    pub enable_logging: bool,
    /// Guard behaviour on navigation.
    pub navigation: NavigationMode,
    /// Drop writes from a fetch once a newer fetch for the same slot has started.
    pub fence_stale_responses: bool,
    /// Base that relative URL templates are joined onto.
    pub base_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            max_total_connections: 100,
            proxy_url: String::new(),
            enable_logging: true,
            navigation: NavigationMode::FireAndForget,
            fence_stale_responses: false,
            base_url: None,
        }
    }
}
