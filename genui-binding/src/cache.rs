//! Bounded cache of derived observables.
//!
//! Each entry owns a derived observable plus the subscription that
//! keeps it synchronized with its source. Eviction is LRU by access
//! order, and an evicted entry's subscription is released so the
//! source observable does not accumulate dead listeners.

use crate::definition::Transform;
use crate::observable::{Observable, Subscription};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

struct CacheEntry {
    observable: Observable<JsonValue>,
    subscription: Subscription,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    access_order: VecDeque<String>,
}

/// LRU cache of transformed observables.
pub struct TransformCache {
    max_size: usize,
    inner: Mutex<CacheInner>,
}

impl std::fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformCache")
            .field("max_size", &self.max_size)
            .field("len", &self.len())
            .finish()
    }
}

impl TransformCache {
    /// Create a cache bounded to `max_size` entries (minimum 1).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                access_order: VecDeque::new(),
            }),
        }
    }

    /// Get the derived observable for `key`, creating it from the
    /// source and transform on first access.
    ///
    /// A hit refreshes the entry's recency; a miss may evict the
    /// least-recently-accessed entry to stay within bounds.
    pub fn get_or_create(
        &self,
        key: &str,
        source: &Observable<JsonValue>,
        transform: Transform,
    ) -> Observable<JsonValue> {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get(key) {
            let observable = entry.observable.clone();
            touch(&mut inner.access_order, key);
            return observable;
        }

        while inner.entries.len() >= self.max_size {
            let Some(oldest) = inner.access_order.pop_front() else {
                break;
            };
            if let Some(mut entry) = inner.entries.remove(&oldest) {
                entry.subscription.unsubscribe();
                debug!(key = %oldest, "evicted derived observable");
            }
        }

        let derived = Observable::new(transform(&source.get()));
        let derived_clone = derived.clone();
        let subscription = source.subscribe(move |value| {
            derived_clone.set(transform(value));
        });

        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                observable: derived.clone(),
                subscription,
            },
        );
        inner.access_order.push_back(key.to_string());
        derived
    }

    /// Remove one entry, releasing its source subscription.
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock();
        if let Some(mut entry) = inner.entries.remove(key) {
            entry.subscription.unsubscribe();
        }
        inner.access_order.retain(|k| k != key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        for (_, mut entry) in inner.entries.drain() {
            entry.subscription.unsubscribe();
        }
        inner.access_order.clear();
    }

    /// Whether the cache holds an entry for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

fn touch(order: &mut VecDeque<String>, key: &str) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        order.remove(pos);
    }
    order.push_back(key.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn uppercase() -> Transform {
        Arc::new(|v: &JsonValue| match v.as_str() {
            Some(s) => json!(s.to_uppercase()),
            None => v.clone(),
        })
    }

    #[test]
    fn test_derived_tracks_source() {
        let cache = TransformCache::new(4);
        let source = Observable::new(json!("hi"));

        let derived = cache.get_or_create("k", &source, uppercase());
        assert_eq!(derived.get(), json!("HI"));

        source.set(json!("more"));
        assert_eq!(derived.get(), json!("MORE"));
    }

    #[test]
    fn test_hit_reuses_entry() {
        let cache = TransformCache::new(4);
        let source = Observable::new(json!("a"));

        let first = cache.get_or_create("k", &source, uppercase());
        let second = cache.get_or_create("k", &source, uppercase());
        assert_eq!(cache.len(), 1);
        assert_eq!(source.listener_count(), 1);

        source.set(json!("b"));
        assert_eq!(first.get(), json!("B"));
        assert_eq!(second.get(), json!("B"));
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = TransformCache::new(2);
        let source = Observable::new(json!("x"));

        cache.get_or_create("a", &source, uppercase());
        cache.get_or_create("b", &source, uppercase());
        cache.get_or_create("c", &source, uppercase());

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        // The evicted entry released its listener.
        assert_eq!(source.listener_count(), 2);
    }

    #[test]
    fn test_access_refreshes_recency() {
        let cache = TransformCache::new(2);
        let source = Observable::new(json!("x"));

        cache.get_or_create("a", &source, uppercase());
        cache.get_or_create("b", &source, uppercase());
        // Touch "a" so "b" becomes the eviction candidate.
        cache.get_or_create("a", &source, uppercase());
        cache.get_or_create("c", &source, uppercase());

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_remove_releases_subscription() {
        let cache = TransformCache::new(4);
        let source = Observable::new(json!("x"));

        cache.get_or_create("k", &source, uppercase());
        assert_eq!(source.listener_count(), 1);

        cache.remove("k");
        assert!(cache.is_empty());
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn test_clear() {
        let cache = TransformCache::new(4);
        let source = Observable::new(json!("x"));
        cache.get_or_create("a", &source, uppercase());
        cache.get_or_create("b", &source, uppercase());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(source.listener_count(), 0);
    }
}
