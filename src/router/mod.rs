//! Router integration: the navigation guard, the read projection, and the
//! seam a host router implements to accept the guard.

mod guard;
mod projection;

pub use guard::FetchGuard;
pub use projection::RouteFetchView;

/// A router that can run a [`FetchGuard`] before each navigation.
///
/// Implementors store the guard and await [`FetchGuard::before_each`] with
/// the target route before committing a navigation.
pub trait NavigationHooks {
    /// Register `guard` to run before every navigation.
    fn before_each(&mut self, guard: FetchGuard);
}
