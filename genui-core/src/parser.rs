//! Conversion of model tool calls and full response bodies into
//! structured UI messages.
//!
//! `parse_tool_use` is the single dispatch point from tool name to
//! message kind; the streaming decoder and the non-streaming path
//! both route through it so the two paths cannot drift.

use crate::messages::{
    A2uiMessage, BeginRendering, DataModelUpdate, DeleteSurface, SurfaceUpdate,
};
use serde_json::Value as JsonValue;

/// Tool names this parser recognizes, in wire form.
pub const KNOWN_TOOLS: [&str; 4] = [
    "begin_rendering",
    "surface_update",
    "data_model_update",
    "delete_surface",
];

/// Whether a tool name maps to a structured message kind.
#[must_use]
pub fn is_known_tool(name: &str) -> bool {
    KNOWN_TOOLS.contains(&name)
}

/// Parse a completed tool call into a structured message.
///
/// Returns `None` for unrecognized tool names and for inputs that do
/// not match the message schema; neither case is an error here, the
/// caller decides whether to drop or report.
#[must_use]
pub fn parse_tool_use(name: &str, input: &JsonValue) -> Option<A2uiMessage> {
    let result = match name {
        "begin_rendering" => serde_json::from_value::<BeginRendering>(input.clone())
            .map(A2uiMessage::BeginRendering),
        "surface_update" => {
            serde_json::from_value::<SurfaceUpdate>(input.clone()).map(A2uiMessage::SurfaceUpdate)
        }
        "data_model_update" => serde_json::from_value::<DataModelUpdate>(input.clone())
            .map(A2uiMessage::DataModelUpdate),
        "delete_surface" => {
            serde_json::from_value::<DeleteSurface>(input.clone()).map(A2uiMessage::DeleteSurface)
        }
        _ => return None,
    };

    match result {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "tool input did not match message schema");
            None
        }
    }
}

/// Result of parsing a complete (non-streamed) response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// Structured messages from recognized tool calls, in order.
    pub messages: Vec<A2uiMessage>,
    /// All text blocks joined with `\n`.
    pub text: String,
    /// Whether any recognized tool call was present.
    pub has_tool_use: bool,
}

/// Parse a full response body with a `content` array of blocks.
///
/// Text blocks are concatenated with `\n`; tool blocks go through
/// [`parse_tool_use`], unknown tool names are skipped. An absent or
/// malformed `content` field yields the empty result.
#[must_use]
pub fn parse_full_message(body: &JsonValue) -> ParsedResponse {
    let Some(content) = body.get("content").and_then(JsonValue::as_array) else {
        return ParsedResponse::default();
    };

    let mut messages = Vec::new();
    let mut text_blocks: Vec<&str> = Vec::new();

    for block in content {
        match block.get("type").and_then(JsonValue::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(JsonValue::as_str) {
                    text_blocks.push(text);
                }
            }
            Some("tool_use") => {
                let Some(name) = block.get("name").and_then(JsonValue::as_str) else {
                    continue;
                };
                let input = block.get("input").cloned().unwrap_or(JsonValue::Null);
                if let Some(message) = parse_tool_use(name, &input) {
                    messages.push(message);
                }
            }
            _ => {}
        }
    }

    let has_tool_use = !messages.is_empty();
    ParsedResponse {
        messages,
        text: text_blocks.join("\n"),
        has_tool_use,
    }
}
