//! Request deduplication.
//!
//! Concurrent calls that share a logical key collapse onto one
//! in-flight execution; every caller observes the same settled
//! outcome. Tracking is bounded: when the map outgrows
//! `max_cache_size`, the oldest entries (by insertion order) are
//! evicted first.

use futures::future::{BoxFuture, FutureExt, Shared};
use genui_core::errors::GenUiError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Result shared between deduplicated callers.
///
/// Errors are wrapped in `Arc` so one failure can be observed by
/// every caller that joined the execution.
pub type SharedResult<T> = Result<T, Arc<GenUiError>>;

/// Deduplication settings.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// When false, every call executes fresh.
    pub enabled: bool,
    /// Upper bound on tracked in-flight entries.
    pub max_cache_size: usize,
    /// How long an in-flight entry may be shared before a new caller
    /// forces a fresh execution.
    pub dedup_window: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cache_size: 100,
            dedup_window: Duration::from_secs(30),
        }
    }
}

/// Derive the logical key for a request payload.
///
/// Canonicalizes the payload (object keys sorted recursively) before
/// hashing, so structurally identical payloads map to the same key
/// regardless of field order.
#[must_use]
pub fn create_key<T: Serialize>(payload: &T) -> String {
    let value = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();

    let mut key = String::with_capacity(64);
    for byte in digest {
        let _ = write!(key, "{:02x}", byte);
    }
    key
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:", serde_json::Value::String((*key).clone()));
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => {
            let _ = write!(out, "{}", other);
        }
    }
}

struct DedupEntry<T: Clone> {
    future: Shared<BoxFuture<'static, SharedResult<T>>>,
    inserted_at: Instant,
    generation: u64,
}

/// Collapses concurrent identical requests into one execution.
pub struct RequestDeduplicator<T: Clone + Send + 'static> {
    config: DedupConfig,
    entries: Mutex<IndexMap<String, DedupEntry<T>>>,
    generations: AtomicU64,
}

impl<T: Clone + Send + 'static> Default for RequestDeduplicator<T> {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}

impl<T: Clone + Send + 'static> RequestDeduplicator<T> {
    /// Create a deduplicator with the given config.
    #[must_use]
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(IndexMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Number of tracked in-flight entries.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether an entry is being tracked for this key.
    #[must_use]
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Execute an operation under a logical key.
    ///
    /// If the key already has a fresh in-flight entry, the operation
    /// is not invoked and the caller joins the pending execution.
    /// Settled entries are removed; entries past the dedup window are
    /// replaced by a fresh execution.
    pub async fn execute<F, Fut>(&self, key: &str, operation: F) -> SharedResult<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, GenUiError>> + Send + 'static,
    {
        if !self.config.enabled {
            return operation().await.map_err(Arc::new);
        }

        enum Role<T: Clone> {
            Joiner(Shared<BoxFuture<'static, SharedResult<T>>>),
            Owner(Shared<BoxFuture<'static, SharedResult<T>>>, u64),
        }

        let role = {
            let mut entries = self.entries.lock();
            let fresh = entries
                .get(key)
                .filter(|entry| entry.inserted_at.elapsed() <= self.config.dedup_window)
                .map(|entry| entry.future.clone());

            match fresh {
                Some(future) => {
                    debug!(key, "joining in-flight request");
                    Role::Joiner(future)
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    let future = async move { operation().await.map_err(Arc::new) }
                        .boxed()
                        .shared();

                    while entries.len() >= self.config.max_cache_size.max(1) {
                        if entries.shift_remove_index(0).is_none() {
                            break;
                        }
                    }
                    entries.insert(
                        key.to_string(),
                        DedupEntry {
                            future: future.clone(),
                            inserted_at: Instant::now(),
                            generation,
                        },
                    );
                    Role::Owner(future, generation)
                }
            }
        };

        match role {
            Role::Joiner(future) => future.await,
            Role::Owner(future, generation) => {
                let result = future.await;
                let mut entries = self.entries.lock();
                // Only remove the entry if it is still ours; a newer
                // execution may have replaced it after the window.
                if entries
                    .get(key)
                    .is_some_and(|entry| entry.generation == generation)
                {
                    entries.shift_remove(key);
                }
                result
            }
        }
    }
}
