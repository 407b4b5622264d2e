//! Request lifecycle metrics.
//!
//! An append-only event log plus derived aggregates. Metrics observe
//! the handler; nothing reads them back for control flow.

use chrono::{DateTime, Utc};
use genui_streaming::UsageInfo;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

/// One recorded lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    /// A logical request began.
    RequestStarted {
        /// Correlation id.
        request_id: String,
        /// Wall-clock start.
        timestamp: DateTime<Utc>,
    },
    /// A transport attempt began.
    AttemptStarted {
        /// Correlation id.
        request_id: String,
        /// 1-based attempt number.
        attempt: u32,
    },
    /// A retry was scheduled after a failed attempt.
    RetryScheduled {
        /// Correlation id.
        request_id: String,
        /// The attempt that failed.
        attempt: u32,
        /// Wait before the next attempt.
        delay: Duration,
    },
    /// The server rate limited an attempt.
    RateLimited {
        /// Correlation id.
        request_id: String,
        /// Server wait hint, if any.
        retry_after: Option<Duration>,
    },
    /// The circuit breaker rejected the request without a call.
    CircuitRejected {
        /// Correlation id.
        request_id: String,
    },
    /// The request finished successfully.
    RequestCompleted {
        /// Correlation id.
        request_id: String,
        /// Attempts consumed.
        attempts: u32,
        /// Total elapsed time.
        duration: Duration,
        /// Token usage, when the stream reported it.
        usage: Option<UsageInfo>,
        /// Stop reason, when the stream reported it.
        stop_reason: Option<String>,
    },
    /// The request failed terminally.
    RequestFailed {
        /// Correlation id.
        request_id: String,
        /// Attempts consumed.
        attempts: u32,
        /// Total elapsed time.
        duration: Duration,
        /// Stable error-kind label.
        error_kind: String,
    },
}

impl MetricEvent {
    /// The request this event belongs to.
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::RequestStarted { request_id, .. }
            | Self::AttemptStarted { request_id, .. }
            | Self::RetryScheduled { request_id, .. }
            | Self::RateLimited { request_id, .. }
            | Self::CircuitRejected { request_id }
            | Self::RequestCompleted { request_id, .. }
            | Self::RequestFailed { request_id, .. } => request_id,
        }
    }

    /// Whether this is a retry event.
    #[must_use]
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::RetryScheduled { .. })
    }
}

/// Aggregate view over the event log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Requests started.
    pub total_requests: u64,
    /// Requests that completed successfully.
    pub completed: u64,
    /// Requests that failed terminally.
    pub failed: u64,
    /// Requests rejected by the circuit breaker.
    pub circuit_rejected: u64,
    /// Rate-limited attempts observed.
    pub rate_limited: u64,
    /// Retries scheduled across all requests.
    pub total_retries: u64,
    /// Mean duration of terminal requests, in milliseconds.
    pub avg_duration_ms: f64,
}

/// Append-only collector shared by all calls.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    events: Mutex<Vec<MetricEvent>>,
}

impl MetricsCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event.
    pub fn record(&self, event: MetricEvent) {
        debug!(request_id = event.request_id(), ?event, "metric");
        self.events.lock().push(event);
    }

    /// Snapshot of the raw event log.
    #[must_use]
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().clone()
    }

    /// Events for one request, in record order.
    #[must_use]
    pub fn events_for(&self, request_id: &str) -> Vec<MetricEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.request_id() == request_id)
            .cloned()
            .collect()
    }

    /// Retries recorded for one request.
    #[must_use]
    pub fn retry_count(&self, request_id: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.request_id() == request_id && e.is_retry())
            .count()
    }

    /// Derived aggregates.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let events = self.events.lock();
        let mut snapshot = MetricsSnapshot::default();
        let mut total_duration = Duration::ZERO;
        let mut terminal = 0u64;

        for event in events.iter() {
            match event {
                MetricEvent::RequestStarted { .. } => snapshot.total_requests += 1,
                MetricEvent::RequestCompleted { duration, .. } => {
                    snapshot.completed += 1;
                    terminal += 1;
                    total_duration += *duration;
                }
                MetricEvent::RequestFailed { duration, .. } => {
                    snapshot.failed += 1;
                    terminal += 1;
                    total_duration += *duration;
                }
                MetricEvent::CircuitRejected { .. } => snapshot.circuit_rejected += 1,
                MetricEvent::RateLimited { .. } => snapshot.rate_limited += 1,
                MetricEvent::RetryScheduled { .. } => snapshot.total_retries += 1,
                MetricEvent::AttemptStarted { .. } => {}
            }
        }

        if terminal > 0 {
            snapshot.avg_duration_ms = total_duration.as_secs_f64() * 1000.0 / terminal as f64;
        }
        snapshot
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> MetricEvent {
        MetricEvent::RequestStarted {
            request_id: id.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_filter() {
        let collector = MetricsCollector::new();
        collector.record(started("r1"));
        collector.record(MetricEvent::RetryScheduled {
            request_id: "r1".into(),
            attempt: 1,
            delay: Duration::ZERO,
        });
        collector.record(started("r2"));

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.events_for("r1").len(), 2);
        assert_eq!(collector.retry_count("r1"), 1);
        assert_eq!(collector.retry_count("r2"), 0);
    }

    #[test]
    fn test_snapshot_aggregates() {
        let collector = MetricsCollector::new();
        collector.record(started("r1"));
        collector.record(MetricEvent::RequestCompleted {
            request_id: "r1".into(),
            attempts: 2,
            duration: Duration::from_millis(100),
            usage: None,
            stop_reason: Some("end_turn".into()),
        });
        collector.record(started("r2"));
        collector.record(MetricEvent::RequestFailed {
            request_id: "r2".into(),
            attempts: 3,
            duration: Duration::from_millis(300),
            error_kind: "server".into(),
        });
        collector.record(MetricEvent::RetryScheduled {
            request_id: "r2".into(),
            attempt: 1,
            delay: Duration::from_millis(10),
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.total_retries, 1);
        assert!((snapshot.avg_duration_ms - 200.0).abs() < f64::EPSILON);
    }
}
