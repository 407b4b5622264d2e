//! Error types for genui.
//!
//! The error taxonomy drives the retry and circuit-breaker layers:
//! every variant carries a fixed retryability classification, and the
//! rate-limit variant carries the server's wait hint.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for genui operations.
#[derive(Error, Debug)]
pub enum GenUiError {
    /// Transport-level network failure (connection refused, reset, DNS).
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Request or stream-inactivity timeout.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// Authentication failure (401/403 class).
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// Rate limited by the server (429).
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// Malformed input rejected by the server (400/422 class).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Server-side failure (5xx class).
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Circuit breaker rejected the call without attempting it.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// Malformed JSON or schema mismatch in a response.
    #[error(transparent)]
    MessageParse(#[from] MessageParseError),

    /// Serialization failure outside the response-parsing path.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using GenUiError.
pub type Result<T> = std::result::Result<T, GenUiError>;

impl GenUiError {
    /// Whether the retry layer may re-attempt after this error.
    ///
    /// Rate limits report `true` here but are handled by a dedicated
    /// path in the stream handler that honors `Retry-After`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.retryable,
            Self::Timeout(_) => true,
            Self::RateLimit(_) => true,
            Self::Server(_) => true,
            Self::Authentication(_)
            | Self::Validation(_)
            | Self::CircuitOpen(_)
            | Self::MessageParse(_)
            | Self::Serialization(_)
            | Self::Internal(_) => false,
        }
    }

    /// Server-suggested wait before retrying, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit(e) => e.retry_after,
            _ => None,
        }
    }

    /// Whether this is a rate-limit error.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimit(_))
    }

    /// Stable machine-readable kind string, used for metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Authentication(_) => "authentication",
            Self::RateLimit(_) => "rate_limit",
            Self::Validation(_) => "validation",
            Self::Server(_) => "server",
            Self::CircuitOpen(_) => "circuit_open",
            Self::MessageParse(_) => "message_parse",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }

    /// Classify an HTTP status code into the taxonomy.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => AuthenticationError::new(status, body).into(),
            429 => RateLimitError::new(body).with_retry_after_opt(retry_after).into(),
            400 | 422 => ValidationError::new(status, body).into(),
            s if s >= 500 => ServerError::new(s, body).into(),
            s => NetworkError::new(format!("unexpected HTTP status {s}: {body}")).into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Transport-level network failure.
#[derive(Error, Debug, Clone)]
pub struct NetworkError {
    /// Human-readable description of the failure.
    pub message: String,
    /// Explicit retryability override; defaults to `true`.
    pub retryable: bool,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network error: {}", self.message)
    }
}

impl NetworkError {
    /// Create a new network error (retryable by default).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Override the retryability flag.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// What timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Overall request timeout elapsed.
    Request,
    /// No data arrived on an open stream within the inactivity window.
    StreamInactivity,
}

/// Request or stream-inactivity timeout.
#[derive(Error, Debug, Clone)]
pub struct TimeoutError {
    /// Which timer fired.
    pub kind: TimeoutKind,
    /// The configured window that elapsed.
    pub elapsed: Duration,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TimeoutKind::Request => write!(f, "Request timed out after {:?}", self.elapsed),
            TimeoutKind::StreamInactivity => {
                write!(f, "Stream inactive for {:?}", self.elapsed)
            }
        }
    }
}

impl TimeoutError {
    /// Create a request timeout.
    pub fn request(elapsed: Duration) -> Self {
        Self {
            kind: TimeoutKind::Request,
            elapsed,
        }
    }

    /// Create a stream-inactivity timeout.
    pub fn inactivity(elapsed: Duration) -> Self {
        Self {
            kind: TimeoutKind::StreamInactivity,
            elapsed,
        }
    }
}

/// Authentication failure (401/403 class). Never retried.
#[derive(Error, Debug, Clone)]
pub struct AuthenticationError {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Authentication failed (status {})", self.status)
    }
}

impl AuthenticationError {
    /// Create a new authentication error.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Rate limited (429). Retried on a dedicated path honoring the hint.
#[derive(Error, Debug, Clone)]
pub struct RateLimitError {
    /// Response body.
    pub body: String,
    /// Parsed `Retry-After` hint, if the server sent one.
    pub retry_after: Option<Duration>,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limited")?;
        if let Some(d) = self.retry_after {
            write!(f, " (retry after {:?})", d)?;
        }
        Ok(())
    }
}

impl RateLimitError {
    /// Create a new rate-limit error.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            retry_after: None,
        }
    }

    /// Attach the server's wait hint.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Attach an optional wait hint.
    #[must_use]
    pub fn with_retry_after_opt(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Malformed input rejected by the server (400/422 class). Never retried.
#[derive(Error, Debug, Clone)]
pub struct ValidationError {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid request (status {}): {}", self.status, self.body)
    }
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Server-side failure (5xx class). Retryable.
#[derive(Error, Debug, Clone)]
pub struct ServerError {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server error (status {})", self.status)
    }
}

impl ServerError {
    /// Create a new server error.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a server error from an error event embedded in a stream.
    pub fn from_stream_error(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            body: message.into(),
        }
    }
}

/// Circuit breaker rejected the call without attempting it.
///
/// Not counted as a fresh failure and never retried by the policy;
/// callers should back off until the recovery window opens.
#[derive(Error, Debug, Clone)]
pub struct CircuitOpenError {
    /// Time remaining until the breaker probes again, if known.
    pub retry_in: Option<Duration>,
}

impl fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circuit breaker is open")?;
        if let Some(d) = self.retry_in {
            write!(f, " (retry in {:?})", d)?;
        }
        Ok(())
    }
}

impl CircuitOpenError {
    /// Create a new circuit-open error.
    #[must_use]
    pub fn new(retry_in: Option<Duration>) -> Self {
        Self { retry_in }
    }
}

/// Malformed JSON or schema mismatch in a response.
///
/// Recoverable: at the block level these are dropped, never surfaced
/// as stream failures.
#[derive(Error, Debug, Clone)]
pub struct MessageParseError {
    /// What failed to parse.
    pub context: String,
    /// Underlying parser message.
    pub detail: String,
}

impl fmt::Display for MessageParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse {}: {}", self.context, self.detail)
    }
}

impl MessageParseError {
    /// Create a new parse error.
    pub fn new(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            detail: detail.into(),
        }
    }
}
