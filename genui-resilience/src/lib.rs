//! # genui-resilience
//!
//! Retry, circuit breaking, rate limiting, and request deduplication
//! for genui.
//!
//! Every network call the stream handler makes goes through this
//! stack: the circuit breaker gates it, the retry policy decides
//! whether and when a failed attempt repeats, the rate limiter queues
//! calls during server-signaled 429 windows, and the deduplicator
//! collapses concurrent identical requests into one execution.
//!
//! ## Core Concepts
//!
//! - **[`RetryPolicy`] / [`retry_with_backoff`]**: pure retry
//!   decisions plus the executor loop
//! - **[`CircuitBreaker`]**: Closed/Open/HalfOpen failure gate
//! - **[`RateLimiter`]**: FIFO queueing during rate-limit windows
//! - **[`RequestDeduplicator`] / [`create_key`]**: at-most-one
//!   execution per logical key
//!
//! ## Example
//!
//! ```ignore
//! use genui_resilience::{retry_with_backoff, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(100));
//!
//! let result = retry_with_backoff(&policy, || async {
//!     // network call here
//!     Ok::<_, genui_core::GenUiError>("ok")
//! }).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod circuit;
pub mod dedup;
pub mod rate_limit;
pub mod retry;

// Re-exports
pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use dedup::{create_key, DedupConfig, RequestDeduplicator, SharedResult};
pub use rate_limit::{parse_retry_after, RateLimiter};
pub use retry::{retry_with_backoff, with_jitter, RetryPolicy};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        create_key, parse_retry_after, retry_with_backoff, CircuitBreaker, CircuitBreakerConfig,
        CircuitState, DedupConfig, RateLimiter, RequestDeduplicator, RetryPolicy,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let policy = RetryPolicy::new().max_attempts(5);
        assert_eq!(policy.max_attempts, 5);
        let breaker = CircuitBreaker::default();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
