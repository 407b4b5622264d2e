//! Stream orchestration.
//!
//! `StreamHandler` composes the resilience stack around the
//! transport: circuit-breaker gating, rate-limit cooperation,
//! retry with backoff, and an inactivity watchdog, feeding every
//! received wire event through the block decoder and emitting the
//! normalized output sequence.
//!
//! Retry happens only while nothing has been exposed to the caller
//! yet. Once any output event has been delivered, a later failure is
//! terminal: the caller never observes a partial attempt followed by
//! a replay of the same content.

use crate::metrics::{MetricEvent, MetricsCollector};
use crate::transport::Transport;
use chrono::Utc;
use futures::{Stream, StreamExt};
use genui_core::errors::{GenUiError, ServerError, TimeoutError};
use genui_core::events::{TaggedStreamEvent, UiStreamEvent};
use genui_core::identifier::{IdGenerator, UuidIdGenerator};
use genui_core::parser::{parse_full_message, ParsedResponse};
use genui_core::request::ChatRequest;
use genui_resilience::{
    create_key, retry_with_backoff, CircuitBreaker, DedupConfig, RateLimiter, RequestDeduplicator,
    RetryPolicy, SharedResult,
};
use genui_streaming::{BlockDecoder, DecodedEvent, UsageInfo, WireEvent};
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Handler tuning knobs.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Retry decisions and backoff delays.
    pub retry_policy: RetryPolicy,
    /// Max quiet time on an open stream before it is cut off.
    pub inactivity_timeout: Duration,
    /// Bound on stream setup (time to first byte).
    pub request_timeout: Duration,
    /// Also emit every raw wire event as a `Delta` passthrough.
    /// Off by default: passthrough counts as exposure and therefore
    /// disables mid-stream retry from the first event on.
    pub emit_raw_deltas: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            inactivity_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(120),
            emit_raw_deltas: false,
        }
    }
}

impl HandlerConfig {
    /// Create the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the inactivity window.
    #[must_use]
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Set the stream-setup bound.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable raw-event passthrough.
    #[must_use]
    pub fn emit_raw_deltas(mut self, emit: bool) -> Self {
        self.emit_raw_deltas = emit;
        self
    }
}

/// Orchestrates streaming and non-streaming calls through the
/// resilience stack.
///
/// One handler (and its breaker, limiter, deduplicator, and metrics)
/// is shared by every concurrent call to the same upstream.
pub struct StreamHandler {
    transport: Arc<dyn Transport>,
    config: HandlerConfig,
    breaker: Arc<CircuitBreaker>,
    rate_limiter: Arc<RateLimiter>,
    deduplicator: Arc<RequestDeduplicator<ParsedResponse>>,
    metrics: Arc<MetricsCollector>,
    ids: Arc<dyn IdGenerator>,
}

impl StreamHandler {
    /// Create a handler over a transport with default components.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: HandlerConfig::default(),
            breaker: Arc::new(CircuitBreaker::default()),
            rate_limiter: Arc::new(RateLimiter::default()),
            deduplicator: Arc::new(RequestDeduplicator::default()),
            metrics: Arc::new(MetricsCollector::new()),
            ids: Arc::new(UuidIdGenerator),
        }
    }

    /// Replace the config.
    #[must_use]
    pub fn with_config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a circuit breaker with other handlers.
    #[must_use]
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// Share a rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Share a metrics collector.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Configure deduplication for the non-streaming path.
    #[must_use]
    pub fn with_dedup_config(mut self, config: DedupConfig) -> Self {
        self.deduplicator = Arc::new(RequestDeduplicator::new(config));
        self
    }

    /// Inject an id generator (pin ids in tests).
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// The metrics collector.
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// The circuit breaker.
    #[must_use]
    pub fn circuit_breaker(&self) -> Arc<CircuitBreaker> {
        self.breaker.clone()
    }

    /// The rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        self.rate_limiter.clone()
    }

    /// Stream a request.
    ///
    /// Returns immediately with the output sequence; the call runs on
    /// a background task that is aborted if the stream is dropped.
    /// The sequence ends with exactly one `Complete` or one `Error`.
    pub fn stream_request(&self, request: ChatRequest) -> UiEventStream {
        let request_id = self.ids.next_id();
        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let ctx = WorkerCtx {
            transport: self.transport.clone(),
            config: self.config.clone(),
            breaker: self.breaker.clone(),
            rate_limiter: self.rate_limiter.clone(),
            metrics: self.metrics.clone(),
            request_id: request_id.clone(),
        };
        let worker = tokio::spawn(run_stream(ctx, request, tx));
        UiEventStream {
            request_id,
            rx,
            worker,
        }
    }

    /// Execute a non-streaming request and parse the full response.
    ///
    /// Concurrent calls with a structurally identical payload are
    /// deduplicated onto one execution; every caller receives the
    /// same settled outcome.
    pub async fn send_request(&self, request: &ChatRequest) -> SharedResult<ParsedResponse> {
        let request_id = self.ids.next_id();
        let key = create_key(request);
        self.metrics.record(MetricEvent::RequestStarted {
            request_id: request_id.clone(),
            timestamp: Utc::now(),
        });
        let started = tokio::time::Instant::now();

        let transport = self.transport.clone();
        let breaker = self.breaker.clone();
        let limiter = self.rate_limiter.clone();
        let policy = self.config.retry_policy.clone();
        let request_owned = request.clone();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_in_op = attempts.clone();

        let result = self
            .deduplicator
            .execute(&key, move || async move {
                retry_with_backoff(&policy, || {
                    let transport = transport.clone();
                    let breaker = breaker.clone();
                    let limiter = limiter.clone();
                    let request = request_owned.clone();
                    let attempts = attempts_in_op.clone();
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        breaker.check_state().map_err(GenUiError::from)?;
                        limiter.acquire().await;
                        match transport.send(&request).await {
                            Ok(body) => {
                                breaker.record_success();
                                Ok(parse_full_message(&body))
                            }
                            Err(error) => {
                                breaker.record_failure();
                                if let GenUiError::RateLimit(rate) = &error {
                                    limiter.record_rate_limit(429, rate.retry_after);
                                }
                                Err(error)
                            }
                        }
                    }
                })
                .await
            })
            .await;

        let duration = started.elapsed();
        match &result {
            Ok(_) => self.metrics.record(MetricEvent::RequestCompleted {
                request_id,
                attempts: attempts.load(Ordering::SeqCst),
                duration,
                usage: None,
                stop_reason: None,
            }),
            Err(error) => self.metrics.record(MetricEvent::RequestFailed {
                request_id,
                attempts: attempts.load(Ordering::SeqCst),
                duration,
                error_kind: error.kind().to_string(),
            }),
        }
        result
    }
}

/// The normalized output sequence of one streaming call.
///
/// Dropping it cancels the underlying call: the worker task is
/// aborted, which releases the transport stream and the inactivity
/// timer. A cancelled call records neither success nor failure
/// against the circuit breaker unless it already reached a terminal
/// state.
#[derive(Debug)]
pub struct UiEventStream {
    request_id: String,
    rx: mpsc::Receiver<TaggedStreamEvent>,
    worker: JoinHandle<()>,
}

impl UiEventStream {
    /// The id tagged onto every event of this call.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Stream for UiEventStream {
    type Item = TaggedStreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for UiEventStream {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

struct WorkerCtx {
    transport: Arc<dyn Transport>,
    config: HandlerConfig,
    breaker: Arc<CircuitBreaker>,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
    request_id: String,
}

enum AttemptOutcome {
    Complete {
        usage: Option<UsageInfo>,
        stop_reason: Option<String>,
    },
    Failed(GenUiError),
    Canceled,
}

async fn send_event(
    tx: &mpsc::Sender<TaggedStreamEvent>,
    request_id: &str,
    event: UiStreamEvent,
) -> bool {
    tx.send(TaggedStreamEvent::new(request_id, event))
        .await
        .is_ok()
}

async fn run_stream(ctx: WorkerCtx, request: ChatRequest, tx: mpsc::Sender<TaggedStreamEvent>) {
    let started = tokio::time::Instant::now();
    ctx.metrics.record(MetricEvent::RequestStarted {
        request_id: ctx.request_id.clone(),
        timestamp: Utc::now(),
    });

    let mut decoder = BlockDecoder::new();
    let mut attempt = 0u32;
    let mut emitted = false;

    loop {
        attempt += 1;
        ctx.metrics.record(MetricEvent::AttemptStarted {
            request_id: ctx.request_id.clone(),
            attempt,
        });

        if let Err(open) = ctx.breaker.check_state() {
            ctx.metrics.record(MetricEvent::CircuitRejected {
                request_id: ctx.request_id.clone(),
            });
            finish_failed(&ctx, attempt, started.elapsed(), open.into(), &tx).await;
            return;
        }

        ctx.rate_limiter.acquire().await;
        decoder.reset();

        match run_attempt(&ctx, &request, &tx, &mut decoder, &mut emitted).await {
            AttemptOutcome::Complete { usage, stop_reason } => {
                ctx.breaker.record_success();
                ctx.metrics.record(MetricEvent::RequestCompleted {
                    request_id: ctx.request_id.clone(),
                    attempts: attempt,
                    duration: started.elapsed(),
                    usage,
                    stop_reason,
                });
                send_event(&tx, &ctx.request_id, UiStreamEvent::Complete).await;
                return;
            }
            AttemptOutcome::Canceled => return,
            AttemptOutcome::Failed(error) => {
                ctx.breaker.record_failure();
                if let GenUiError::RateLimit(rate) = &error {
                    ctx.rate_limiter.record_rate_limit(429, rate.retry_after);
                    ctx.metrics.record(MetricEvent::RateLimited {
                        request_id: ctx.request_id.clone(),
                        retry_after: rate.retry_after,
                    });
                }

                // 429 is retried within the attempt budget no matter
                // what the generic classification says; everything
                // else goes through the policy. Exposure disables
                // both paths.
                let budget_left = attempt < ctx.config.retry_policy.max_attempts;
                let retryable = error.is_rate_limit()
                    || ctx.config.retry_policy.should_retry(&error, attempt);
                if !emitted && budget_left && retryable {
                    let delay = match error.retry_after() {
                        Some(hint) => hint,
                        None => ctx.config.retry_policy.delay_for_attempt(attempt - 1),
                    };
                    ctx.metrics.record(MetricEvent::RetryScheduled {
                        request_id: ctx.request_id.clone(),
                        attempt,
                        delay,
                    });
                    debug!(
                        request_id = %ctx.request_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying stream attempt"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                finish_failed(&ctx, attempt, started.elapsed(), error, &tx).await;
                return;
            }
        }
    }
}

async fn finish_failed(
    ctx: &WorkerCtx,
    attempts: u32,
    duration: Duration,
    error: GenUiError,
    tx: &mpsc::Sender<TaggedStreamEvent>,
) {
    ctx.metrics.record(MetricEvent::RequestFailed {
        request_id: ctx.request_id.clone(),
        attempts,
        duration,
        error_kind: error.kind().to_string(),
    });
    send_event(tx, &ctx.request_id, UiStreamEvent::Error(error)).await;
}

async fn run_attempt(
    ctx: &WorkerCtx,
    request: &ChatRequest,
    tx: &mpsc::Sender<TaggedStreamEvent>,
    decoder: &mut BlockDecoder,
    emitted: &mut bool,
) -> AttemptOutcome {
    let mut usage: Option<UsageInfo> = None;
    let mut stop_reason: Option<String> = None;

    let setup = tokio::time::timeout(
        ctx.config.request_timeout,
        ctx.transport.create_stream(request),
    )
    .await;
    let mut stream = match setup {
        Err(_) => {
            return AttemptOutcome::Failed(TimeoutError::request(ctx.config.request_timeout).into())
        }
        Ok(Err(error)) => return AttemptOutcome::Failed(error),
        Ok(Ok(stream)) => stream,
    };

    loop {
        let item = match tokio::time::timeout(ctx.config.inactivity_timeout, stream.next()).await {
            Err(_) => {
                return AttemptOutcome::Failed(
                    TimeoutError::inactivity(ctx.config.inactivity_timeout).into(),
                )
            }
            Ok(item) => item,
        };

        let raw = match item {
            None => return AttemptOutcome::Complete { usage, stop_reason },
            Some(Err(error)) => return AttemptOutcome::Failed(error),
            Some(Ok(raw)) => raw,
        };

        if ctx.config.emit_raw_deltas {
            if !send_event(tx, &ctx.request_id, UiStreamEvent::Delta(raw.clone())).await {
                return AttemptOutcome::Canceled;
            }
            *emitted = true;
        }

        let Some(event) = WireEvent::from_raw(&raw) else {
            continue;
        };

        match event {
            WireEvent::MessageStart { message } => {
                if let Some(info) = message {
                    if let Some(u) = info.usage {
                        usage.get_or_insert_with(UsageInfo::default).merge(&u);
                    }
                }
            }
            WireEvent::MessageDelta {
                delta,
                usage: delta_usage,
            } => {
                if let Some(u) = delta_usage {
                    usage.get_or_insert_with(UsageInfo::default).merge(&u);
                }
                if let Some(info) = delta {
                    if info.stop_reason.is_some() {
                        stop_reason = info.stop_reason;
                    }
                }
            }
            WireEvent::MessageStop => return AttemptOutcome::Complete { usage, stop_reason },
            WireEvent::Ping => {}
            WireEvent::Error { message } => {
                return AttemptOutcome::Failed(ServerError::from_stream_error(message).into())
            }
            block_event => {
                for decoded in decoder.handle_event(&block_event) {
                    let ui_event = match decoded {
                        DecodedEvent::TextDelta(text) => UiStreamEvent::TextDelta(text),
                        DecodedEvent::Thinking {
                            content,
                            is_complete,
                        } => UiStreamEvent::Thinking {
                            content,
                            is_complete,
                        },
                        DecodedEvent::Message(message) => UiStreamEvent::StructuredMessage(message),
                    };
                    if !send_event(tx, &ctx.request_id, ui_event).await {
                        return AttemptOutcome::Canceled;
                    }
                    *emitted = true;
                }
            }
        }
    }
}
