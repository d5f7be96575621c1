//! Reactive per-route state.
//!
//! [`StateStore`] maps each route key to a [`RouteState`] whose fields are
//! [`Observable`] cells, laid out in the shape of the route's fetch spec.

mod observable;
mod store;

pub use observable::Observable;
pub use store::{RouteState, StateSlot, StateStore, StateValue};
