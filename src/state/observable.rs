//! Observable cells.
//!
//! An [`Observable`] is a shared, mutable value that readers can subscribe to.
//! It is a thin handle over a [`tokio::sync::watch`] channel: every `set` wakes
//! all subscribers, and cloning the handle shares the same underlying value.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A shared value whose changes can be observed.
///
/// # Examples
///
/// ```
/// use router_fetch::Observable;
///
/// let fetching = Observable::new(false);
/// let view = fetching.clone();
///
/// fetching.set(true);
/// assert!(view.get());
/// ```
pub struct Observable<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Observable<T> {
    /// Create a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Modify the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Read the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.tx.borrow())
    }

    /// A receiver that observes every subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Whether two handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

impl<T: Clone> Observable<T> {
    /// Clone the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// The current value followed by every change, as a stream.
    pub fn stream(&self) -> WatchStream<T> {
        WatchStream::new(self.subscribe())
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&*self.tx.borrow()).finish()
    }
}
