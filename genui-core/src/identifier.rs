//! ID generation.
//!
//! Request and surface ids are prefixed UUIDs. The handler takes its
//! generator as a dependency so tests can pin ids deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Generate a unique request id.
#[must_use]
pub fn generate_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

/// Generate a unique surface id.
#[must_use]
pub fn generate_surface_id() -> String {
    format!("sfc_{}", Uuid::new_v4().simple())
}

/// Source of request ids.
pub trait IdGenerator: Send + Sync {
    /// Produce the next id.
    fn next_id(&self) -> String;
}

/// Production generator backed by UUID v4.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        generate_request_id()
    }
}

/// Deterministic generator for tests: `<prefix>_0`, `<prefix>_1`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Create a generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        })
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_format() {
        let id = generate_request_id();
        assert!(id.starts_with("req_"));
        assert_eq!(id.len(), 36); // "req_" + 32 hex chars
    }

    #[test]
    fn test_request_ids_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }

    #[test]
    fn test_sequential_generator() {
        let gen = SequentialIdGenerator::new("req");
        assert_eq!(gen.next_id(), "req_0");
        assert_eq!(gen.next_id(), "req_1");
        assert_eq!(gen.next_id(), "req_2");
    }
}
