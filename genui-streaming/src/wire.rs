//! Wire protocol event types.
//!
//! The raw event shapes the transport delivers, as a tagged union.
//! Every map carries a `type` field; payload fields are type-specific.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A raw protocol event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Stream opened; carries message metadata and initial usage.
    MessageStart {
        /// Message metadata.
        #[serde(default)]
        message: Option<MessageStartInfo>,
    },

    /// A content block opened at `index`.
    ContentBlockStart {
        /// Block index; blocks may interleave but each index opens
        /// exactly once.
        index: usize,
        /// What kind of block opened.
        content_block: ContentBlockInfo,
    },

    /// Incremental content for the block at `index`.
    ContentBlockDelta {
        /// Block index.
        index: usize,
        /// The delta payload.
        delta: BlockDelta,
    },

    /// The block at `index` is complete.
    ContentBlockStop {
        /// Block index.
        index: usize,
    },

    /// Top-level message metadata update.
    MessageDelta {
        /// Stop reason and related fields.
        #[serde(default)]
        delta: Option<MessageDeltaInfo>,
        /// Output-side usage so far.
        #[serde(default)]
        usage: Option<UsageInfo>,
    },

    /// The message is complete; terminal success marker.
    MessageStop,

    /// Keep-alive; resets inactivity timers, carries nothing.
    Ping,

    /// Recoverable error embedded in the stream.
    Error {
        /// Error description from the server.
        message: String,
    },
}

impl WireEvent {
    /// Parse a raw event map, returning `None` for event types this
    /// layer does not recognize (forward compatibility: unknown types
    /// are skipped, not fatal).
    #[must_use]
    pub fn from_raw(raw: &JsonValue) -> Option<Self> {
        match serde_json::from_value(raw.clone()) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unrecognized wire event");
                None
            }
        }
    }
}

/// Payload of a `content_block_start` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockInfo {
    /// Plain text block.
    Text {
        /// Initial text, usually empty.
        #[serde(default)]
        text: String,
    },
    /// Tool invocation block; arguments arrive as JSON fragments.
    ToolUse {
        /// Provider-assigned call id.
        #[serde(default)]
        id: Option<String>,
        /// Tool name.
        name: String,
        /// Initial input, usually an empty object.
        #[serde(default)]
        input: Option<JsonValue>,
    },
    /// Model reasoning block.
    Thinking {
        /// Initial reasoning text, usually empty.
        #[serde(default)]
        thinking: String,
    },
}

/// Payload of a `content_block_delta` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Text fragment.
    TextDelta {
        /// The fragment.
        text: String,
    },
    /// Tool-argument JSON fragment; not valid JSON on its own.
    InputJsonDelta {
        /// The fragment.
        partial_json: String,
    },
    /// Reasoning fragment.
    ThinkingDelta {
        /// The fragment.
        thinking: String,
    },
    /// Reasoning signature fragment; carried for completeness,
    /// ignored by the decoder.
    SignatureDelta {
        /// The fragment.
        signature: String,
    },
}

/// Metadata from `message_start`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageStartInfo {
    /// Provider message id.
    #[serde(default)]
    pub id: Option<String>,
    /// Model that is responding.
    #[serde(default)]
    pub model: Option<String>,
    /// Input-side usage.
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

/// Metadata from `message_delta`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageDeltaInfo {
    /// Why generation stopped, when known.
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Token usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageInfo {
    /// Prompt tokens consumed.
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens produced.
    #[serde(default)]
    pub output_tokens: u64,
}

impl UsageInfo {
    /// Merge a later usage report into this one. Later reports carry
    /// the running total, so fields are overwritten when non-zero.
    pub fn merge(&mut self, other: &UsageInfo) {
        if other.input_tokens > 0 {
            self.input_tokens = other.input_tokens;
        }
        if other.output_tokens > 0 {
            self.output_tokens = other.output_tokens;
        }
    }

    /// Total tokens across both sides.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
