#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Route-driven data fetching
//!
//! Routes declare what data they need; a navigation guard fetches it and
//! stores the results in per-route reactive state that views read back.
//!
//! ## Overview
//!
//! A route's [`FetchSpec`] is one of:
//!
//! 1. **URL template** - `https://api/foos/:id`, with `:name` placeholders filled from route params
//! 2. **Resolver** - an async function of the route whose result is stored verbatim
//! 3. **Named group** - several of the above, each tracked under its own name
//!
//! On every navigation the guard:
//!
//! - initializes the route's [`RouteState`] once per route key (reused afterwards)
//! - rebuilds the route's [`ActionSet`] against the new params and options
//! - triggers the fetch, either in the background or awaited ([`NavigationMode`])
//!
//! Each slot of a [`RouteState`] has three [`Observable`] cells: `data`,
//! `fetching` and `response`. A failed fetch clears `fetching` and leaves the
//! other two untouched.
//!
//! ## Usage
//!
//! ```no_run
//! use router_fetch::{FetchSpec, RequestOptions, Route, RouterFetch};
//!
//! #[tokio::main]
//! async fn main() -> router_fetch::Result<()> {
//!     let plugin = RouterFetch::new(RequestOptions::new().with_header("Authorization", "Bearer token"));
//!     let guard = plugin.guard();
//!
//!     let route = Route::new("/foos/42")
//!         .with_matched("/foos/:id")
//!         .with_param("id", "42")
//!         .with_fetch(FetchSpec::url("https://api.example.com/foos/:id"));
//!
//!     guard.before_each(&route).await?;
//!
//!     let view = plugin.use_route_fetch(&route);
//!     if let Some(fetching) = view.fetching.as_ref().and_then(|f| f.single().cloned()) {
//!         let mut rx = fetching.subscribe();
//!         rx.wait_for(|busy| !busy).await.ok();
//!     }
//!     println!("{:?}", view.data.and_then(|d| d.get()));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Routes, fetch specs and route keys
//! - **[error]** - Error types and result handling
//! - **[protocol]** - URL template resolution and option merging
//! - **[client]** - Transport, fetch client and per-route actions
//! - **[state]** - Observable cells and the per-route state store
//! - **[router]** - Navigation guard, read projection and the router seam

pub mod client;
pub mod error;
pub mod protocol;
pub mod router;
pub mod state;
pub mod types;

mod plugin;

pub use client::{ActionResult, ActionSet, ClientConfig, FetchAction, FetchClient, FetchResponse, NavigationMode};
pub use error::{FetchError, Result};
pub use plugin::RouterFetch;
pub use protocol::{HeaderSource, Headers, RequestOptions};
pub use router::{FetchGuard, NavigationHooks, RouteFetchView};
pub use state::{Observable, RouteState, StateSlot, StateStore};
pub use types::{
    FetchSpec, Resolver, Route, RouteFetchOptions, RouteKey, RouteMeta, RouteParams, RouteRecord, SingleSpec,
};
