//! Rate-limit cooperation.
//!
//! The limiter does not meter requests itself; it reacts to 429
//! responses the server already sent. While a window is active, new
//! calls queue and are released in FIFO order when it elapses.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Parse a `Retry-After` header value as integer seconds.
#[must_use]
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[derive(Debug)]
struct LimiterInner {
    limited_until: Option<Instant>,
    waiters: VecDeque<oneshot::Sender<()>>,
    drain_scheduled: bool,
}

/// Tracks externally-signaled rate-limit windows.
///
/// Cheap to clone-share via `Arc`; one instance serves all concurrent
/// calls to the same upstream.
#[derive(Debug)]
pub struct RateLimiter {
    inner: Arc<Mutex<LimiterInner>>,
    default_window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl RateLimiter {
    /// Create a limiter with the window used when the server sends no
    /// `Retry-After`.
    #[must_use]
    pub fn new(default_window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimiterInner {
                limited_until: None,
                waiters: VecDeque::new(),
                drain_scheduled: false,
            })),
            default_window,
        }
    }

    /// Whether a rate-limit window is currently active.
    #[must_use]
    pub fn is_limited(&self) -> bool {
        let inner = self.inner.lock();
        matches!(inner.limited_until, Some(deadline) if Instant::now() < deadline)
    }

    /// Record a response status. Anything other than 429 is a no-op;
    /// a 429 opens (or extends) the window and schedules the FIFO
    /// drain. Must be called from within a tokio runtime.
    pub fn record_rate_limit(&self, status: u16, retry_after: Option<Duration>) {
        if status != 429 {
            return;
        }
        let window = retry_after.unwrap_or(self.default_window);
        let deadline = Instant::now() + window;

        let schedule = {
            let mut inner = self.inner.lock();
            let extended = match inner.limited_until {
                Some(current) => deadline.max(current),
                None => deadline,
            };
            inner.limited_until = Some(extended);
            if inner.drain_scheduled {
                false
            } else {
                inner.drain_scheduled = true;
                true
            }
        };

        warn!(window_ms = window.as_millis() as u64, "rate limited, queueing calls");

        if schedule {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                loop {
                    let deadline = inner.lock().limited_until;
                    match deadline {
                        // A later 429 may push the deadline out while
                        // we sleep; re-check on wake.
                        Some(d) if Instant::now() < d => {
                            tokio::time::sleep_until(d).await;
                        }
                        _ => {
                            let waiters = {
                                let mut guard = inner.lock();
                                guard.limited_until = None;
                                guard.drain_scheduled = false;
                                std::mem::take(&mut guard.waiters)
                            };
                            debug!(
                                count = waiters.len(),
                                "rate-limit window elapsed, draining queue"
                            );
                            for waiter in waiters {
                                let _ = waiter.send(());
                            }
                            break;
                        }
                    }
                }
            });
        }
    }

    /// Wait until no rate-limit window is active.
    pub async fn acquire(&self) {
        loop {
            let rx = {
                let mut inner = self.inner.lock();
                match inner.limited_until {
                    Some(deadline) if Instant::now() < deadline => {
                        let (tx, rx) = oneshot::channel();
                        inner.waiters.push_back(tx);
                        rx
                    }
                    _ => {
                        inner.limited_until = None;
                        return;
                    }
                }
            };
            // A dropped sender only means the drain already ran.
            let _ = rx.await;
        }
    }

    /// Run an operation, queueing it first if a window is active.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        self.acquire().await;
        operation().await
    }

    /// Number of calls currently queued.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.lock().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("2")), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(Some(" 10 ")), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(Some("")), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[tokio::test]
    async fn test_non_429_is_noop() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        limiter.record_rate_limit(500, None);
        limiter.record_rate_limit(200, None);
        assert!(!limiter.is_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_opens_window_then_clears() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        limiter.record_rate_limit(429, Some(Duration::from_secs(2)));
        assert!(limiter.is_limited());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(!limiter.is_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_queue_and_drain_fifo() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60)));
        limiter.record_rate_limit(429, Some(Duration::from_secs(1)));

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..3 {
            let limiter = limiter.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .execute(|| async {
                        order.lock().push(i);
                    })
                    .await;
            }));
            // Let the task park itself in the queue before spawning
            // the next, so FIFO order is observable.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(limiter.queued(), 3);

        tokio::time::sleep(Duration::from_secs(2)).await;
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(!limiter.is_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_runs_immediately_when_unlimited() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        limiter
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_window_used_without_retry_after() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        limiter.record_rate_limit(429, None);
        assert!(limiter.is_limited());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(limiter.is_limited());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!limiter.is_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_429_extends_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        limiter.record_rate_limit(429, Some(Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(500)).await;
        limiter.record_rate_limit(429, Some(Duration::from_secs(2)));

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(limiter.is_limited());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!limiter.is_limited());
    }
}
