//! Observable values with explicit subscription handles.
//!
//! Listeners are removed through the handle returned by `subscribe`,
//! never by garbage collection, so teardown is deterministic and
//! testable.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ObservableInner<T> {
    value: Mutex<T>,
    listeners: Mutex<BTreeMap<u64, Listener<T>>>,
    next_listener_id: AtomicU64,
}

/// A shared mutable value that notifies subscribers on every set.
///
/// Cloning shares the underlying value; all clones observe the same
/// state and listeners.
pub struct Observable<T> {
    inner: Arc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.lock())
            .field("listeners", &self.inner.listeners.lock().len())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    /// Create an observable holding the initial value.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                value: Mutex::new(initial),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Replace the value and notify every listener.
    ///
    /// Listeners run on the calling thread, outside the value lock,
    /// in subscription order.
    pub fn set(&self, value: T) {
        *self.inner.value.lock() = value.clone();
        let listeners: Vec<Listener<T>> = self.inner.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(&value);
        }
    }

    /// Register a listener; the returned handle removes it.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().insert(id, Arc::new(listener));

        let weak: Weak<ObservableInner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.listeners.lock().remove(&id);
                }
            })),
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

/// Handle to a registered listener.
///
/// Dropping the handle does NOT remove the listener; call
/// [`Subscription::unsubscribe`] for deterministic teardown.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// Remove the listener. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the listener is still registered through this handle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let obs = Observable::new(1);
        assert_eq!(obs.get(), 1);
        obs.set(5);
        assert_eq!(obs.get(), 5);
    }

    #[test]
    fn test_listener_notified() {
        let obs = Observable::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let _sub = obs.subscribe(move |v| seen_clone.lock().push(*v));
        obs.set(1);
        obs.set(2);

        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let obs = Observable::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let mut sub = obs.subscribe(move |v| seen_clone.lock().push(*v));
        obs.set(1);
        assert_eq!(obs.listener_count(), 1);

        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(obs.listener_count(), 0);

        obs.set(2);
        assert_eq!(*seen.lock(), vec![1]);

        // Idempotent.
        sub.unsubscribe();
    }

    #[test]
    fn test_drop_does_not_unsubscribe() {
        let obs = Observable::new(0);
        let sub = obs.subscribe(|_| {});
        drop(sub);
        assert_eq!(obs.listener_count(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Observable::new(String::new());
        let b = a.clone();
        a.set("shared".to_string());
        assert_eq!(b.get(), "shared");
    }

    #[test]
    fn test_multiple_listeners_in_subscription_order() {
        let obs = Observable::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        let _s1 = obs.subscribe(move |_| o1.lock().push("first"));
        let o2 = order.clone();
        let _s2 = obs.subscribe(move |_| o2.lock().push("second"));

        obs.set(1);
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }
}
