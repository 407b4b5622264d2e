//! Normalized output events.
//!
//! This is the union the UI layer consumes. One call to stream a
//! request produces a finite ordered sequence of these, terminated by
//! exactly one `Complete` or exactly one `Error`.

use crate::errors::GenUiError;
use crate::messages::A2uiMessage;
use serde_json::Value as JsonValue;
use std::fmt;

/// One normalized event in the output stream.
#[derive(Debug)]
pub enum UiStreamEvent {
    /// Raw wire event passthrough for observers that want the
    /// unprocessed protocol map.
    Delta(JsonValue),
    /// A completed structured UI message.
    StructuredMessage(A2uiMessage),
    /// Incremental text content.
    TextDelta(String),
    /// Model reasoning content. Partials stream with
    /// `is_complete == false`; block completion emits the full
    /// accumulated content once with `is_complete == true`.
    Thinking {
        /// Reasoning content.
        content: String,
        /// Whether the thinking block has finished.
        is_complete: bool,
    },
    /// The stream finished successfully.
    Complete,
    /// The stream failed; no further events follow.
    Error(GenUiError),
}

impl UiStreamEvent {
    /// Create a partial thinking event.
    pub fn thinking_partial(content: impl Into<String>) -> Self {
        Self::Thinking {
            content: content.into(),
            is_complete: false,
        }
    }

    /// Create a final thinking event.
    pub fn thinking_complete(content: impl Into<String>) -> Self {
        Self::Thinking {
            content: content.into(),
            is_complete: true,
        }
    }

    /// Whether this event terminates the sequence.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }

    /// The text content, if this is a text delta.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::TextDelta(text) => Some(text),
            _ => None,
        }
    }

    /// The structured message, if this carries one.
    #[must_use]
    pub fn as_message(&self) -> Option<&A2uiMessage> {
        match self {
            Self::StructuredMessage(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for UiStreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delta(_) => write!(f, "[delta]"),
            Self::StructuredMessage(m) => write!(f, "[message] {}", m.discriminant()),
            Self::TextDelta(text) => write!(f, "{}", text),
            Self::Thinking { is_complete, .. } => {
                write!(f, "[thinking{}]", if *is_complete { " complete" } else { "" })
            }
            Self::Complete => write!(f, "[complete]"),
            Self::Error(e) => write!(f, "[error] {}", e),
        }
    }
}

/// An output event tagged with the request it belongs to.
///
/// The request id is generated per logical call and stays stable
/// across internal retry attempts, so consumers can correlate output
/// events with metrics events.
#[derive(Debug)]
pub struct TaggedStreamEvent {
    /// Correlation id for the originating request.
    pub request_id: String,
    /// The event payload.
    pub event: UiStreamEvent,
}

impl TaggedStreamEvent {
    /// Tag an event with a request id.
    pub fn new(request_id: impl Into<String>, event: UiStreamEvent) -> Self {
        Self {
            request_id: request_id.into(),
            event,
        }
    }
}
