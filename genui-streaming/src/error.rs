//! Streaming errors.

use thiserror::Error;

/// Errors from the SSE and wire-decoding layers.
#[derive(Debug, Error)]
pub enum StreamError {
    /// SSE buffer grew past the configured bound without an event
    /// boundary.
    #[error("SSE buffer overflow")]
    BufferOverflow,

    /// Failed to parse an SSE data payload as a wire event.
    #[error("Failed to parse wire event: {0}")]
    ParseWire(String),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error from the underlying byte stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
