//! Fetch client, transport and per-route actions.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config    - Client and guard configuration
//! ├── transport - Transport trait and the reqwest implementation
//! ├── fetch     - FetchClient: template resolution and sending
//! └── actions   - Fetch triggers, verb helpers and the action registry
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`FetchClient`] | Resolves URL templates and sends requests |
//! | [`Transport`] | Network boundary; [`ReqwestTransport`] in production |
//! | [`ActionRegistry`] | Per-route [`ActionSet`]s keyed by route key |
//! | [`FetchAction`] | A route's single or named fetch trigger |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ```
//! use router_fetch::client::{ClientConfig, FetchClient};
//!
//! let client = FetchClient::with_config(ClientConfig {
//!     request_timeout_ms: 5_000,
//!     ..Default::default()
//! });
//! assert_eq!(client.config().request_timeout_ms, 5_000);
//! ```

mod actions;
mod config;
mod fetch;
mod transport;

pub use actions::{ActionRegistry, ActionSet, FetchAction, FetchTrigger, NamedFetch, RouteRequester};
pub use config::{ClientConfig, NavigationMode};
pub use fetch::{ActionResult, FetchClient};
pub use transport::{FetchResponse, HttpRequest, ReqwestTransport, Transport};
