//! Block-level stream decoding.
//!
//! Reconstructs complete content blocks from the interleaved
//! start/delta/stop wire events. Text and thinking content is
//! surfaced incrementally; tool-call JSON is buffered verbatim and
//! only parsed when the block closes. A block that fails to parse is
//! dropped, never fatal.

use crate::wire::{BlockDelta, ContentBlockInfo, WireEvent};
use genui_core::messages::A2uiMessage;
use genui_core::parser::parse_tool_use;
use std::collections::HashMap;

/// Output of the decoder for one wire event.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// Incremental text from a text block.
    TextDelta(String),
    /// Reasoning content. Deltas stream with `is_complete == false`;
    /// the closing event carries the full accumulated content.
    Thinking {
        /// Content: the fragment for partials, the whole block when
        /// complete.
        content: String,
        /// Whether the block has closed.
        is_complete: bool,
    },
    /// A structured message decoded from a completed tool block.
    Message(A2uiMessage),
}

/// Per-index state for a block in progress.
#[derive(Debug, Clone)]
enum BlockState {
    Text,
    ToolUse { name: String, input_json: String },
    Thinking { content: String },
}

/// Reconstructs blocks from an ordered event sequence.
///
/// Callers reuse one decoder across retry attempts by calling
/// [`BlockDecoder::reset`] between them.
#[derive(Debug, Default)]
pub struct BlockDecoder {
    blocks: HashMap<usize, BlockState>,
}

impl BlockDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently open.
    #[must_use]
    pub fn open_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Clear all per-index buffers.
    pub fn reset(&mut self) {
        self.blocks.clear();
    }

    /// Process one wire event, returning any decoded output.
    ///
    /// Non-block events (message lifecycle, ping, error) produce no
    /// output here; the stream handler owns their semantics.
    pub fn handle_event(&mut self, event: &WireEvent) -> Vec<DecodedEvent> {
        match event {
            WireEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                self.handle_start(*index, content_block);
                Vec::new()
            }
            WireEvent::ContentBlockDelta { index, delta } => self.handle_delta(*index, delta),
            WireEvent::ContentBlockStop { index } => self.handle_stop(*index),
            _ => Vec::new(),
        }
    }

    fn handle_start(&mut self, index: usize, info: &ContentBlockInfo) {
        let state = match info {
            ContentBlockInfo::Text { .. } => BlockState::Text,
            ContentBlockInfo::ToolUse { name, input, .. } => {
                // Some providers put the complete input on the start
                // event and send no deltas; seed the buffer with it.
                let input_json = match input {
                    Some(value) if value.as_object().is_some_and(|m| !m.is_empty()) => {
                        value.to_string()
                    }
                    _ => String::new(),
                };
                BlockState::ToolUse {
                    name: name.clone(),
                    input_json,
                }
            }
            ContentBlockInfo::Thinking { thinking } => BlockState::Thinking {
                content: thinking.clone(),
            },
        };
        self.blocks.insert(index, state);
    }

    fn handle_delta(&mut self, index: usize, delta: &BlockDelta) -> Vec<DecodedEvent> {
        let Some(state) = self.blocks.get_mut(&index) else {
            tracing::warn!(index, "delta for unopened block, ignoring");
            return Vec::new();
        };

        match (state, delta) {
            (BlockState::Text, BlockDelta::TextDelta { text }) => {
                vec![DecodedEvent::TextDelta(text.clone())]
            }
            (BlockState::ToolUse { input_json, .. }, BlockDelta::InputJsonDelta { partial_json }) => {
                input_json.push_str(partial_json);
                Vec::new()
            }
            (BlockState::Thinking { content }, BlockDelta::ThinkingDelta { thinking }) => {
                content.push_str(thinking);
                vec![DecodedEvent::Thinking {
                    content: thinking.clone(),
                    is_complete: false,
                }]
            }
            (_, BlockDelta::SignatureDelta { .. }) => Vec::new(),
            (state, delta) => {
                tracing::warn!(index, ?delta, ?state, "delta kind does not match block kind");
                Vec::new()
            }
        }
    }

    fn handle_stop(&mut self, index: usize) -> Vec<DecodedEvent> {
        let Some(state) = self.blocks.remove(&index) else {
            return Vec::new();
        };

        match state {
            BlockState::Text => Vec::new(),
            BlockState::Thinking { content } => vec![DecodedEvent::Thinking {
                content,
                is_complete: true,
            }],
            BlockState::ToolUse { name, input_json } => {
                let input = match serde_json::from_str(&input_json) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(
                            index,
                            tool = %name,
                            error = %e,
                            "dropping tool block with unparseable input"
                        );
                        return Vec::new();
                    }
                };
                match parse_tool_use(&name, &input) {
                    Some(message) => vec![DecodedEvent::Message(message)],
                    None => {
                        tracing::debug!(index, tool = %name, "dropping unrecognized tool block");
                        Vec::new()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genui_core::messages::A2uiMessage;
    use serde_json::json;

    fn start_tool(index: usize, name: &str) -> WireEvent {
        serde_json::from_value(json!({
            "type": "content_block_start",
            "index": index,
            "content_block": {"type": "tool_use", "id": format!("tu_{index}"), "name": name, "input": {}}
        }))
        .unwrap()
    }

    fn json_delta(index: usize, fragment: &str) -> WireEvent {
        WireEvent::ContentBlockDelta {
            index,
            delta: BlockDelta::InputJsonDelta {
                partial_json: fragment.to_string(),
            },
        }
    }

    fn stop(index: usize) -> WireEvent {
        WireEvent::ContentBlockStop { index }
    }

    fn decode_all(decoder: &mut BlockDecoder, events: &[WireEvent]) -> Vec<DecodedEvent> {
        events
            .iter()
            .flat_map(|e| decoder.handle_event(e))
            .collect()
    }

    #[test]
    fn test_tool_block_decodes_to_message() {
        let mut decoder = BlockDecoder::new();
        let out = decode_all(
            &mut decoder,
            &[
                start_tool(0, "begin_rendering"),
                json_delta(0, "{\"surfaceId\":"),
                json_delta(0, "\"s1\"}"),
                stop(0),
            ],
        );

        assert_eq!(out.len(), 1);
        match &out[0] {
            DecodedEvent::Message(A2uiMessage::BeginRendering(m)) => {
                assert_eq!(m.surface_id, "s1");
            }
            other => panic!("expected BeginRendering, got {:?}", other),
        }
        assert_eq!(decoder.open_blocks(), 0);
    }

    #[test]
    fn test_unknown_tool_dropped() {
        let mut decoder = BlockDecoder::new();
        let out = decode_all(
            &mut decoder,
            &[
                start_tool(0, "render_chart"),
                json_delta(0, "{\"surfaceId\":\"s1\"}"),
                stop(0),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_malformed_json_dropped() {
        let mut decoder = BlockDecoder::new();
        let out = decode_all(
            &mut decoder,
            &[
                start_tool(0, "begin_rendering"),
                json_delta(0, "{\"surfaceId\": \"s1\""),
                stop(0),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_text_deltas_forwarded_immediately() {
        let mut decoder = BlockDecoder::new();
        let start: WireEvent = serde_json::from_value(json!({
            "type": "content_block_start",
            "index": 0,
            "content_block": {"type": "text", "text": ""}
        }))
        .unwrap();

        assert!(decoder.handle_event(&start).is_empty());

        let out = decoder.handle_event(&WireEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::TextDelta {
                text: "Hello".into(),
            },
        });
        assert_eq!(out, vec![DecodedEvent::TextDelta("Hello".into())]);

        // Text block close produces nothing extra.
        assert!(decoder.handle_event(&stop(0)).is_empty());
    }

    #[test]
    fn test_thinking_partials_and_final() {
        let mut decoder = BlockDecoder::new();
        let start: WireEvent = serde_json::from_value(json!({
            "type": "content_block_start",
            "index": 2,
            "content_block": {"type": "thinking", "thinking": ""}
        }))
        .unwrap();
        decoder.handle_event(&start);

        let out = decoder.handle_event(&WireEvent::ContentBlockDelta {
            index: 2,
            delta: BlockDelta::ThinkingDelta {
                thinking: "Let me ".into(),
            },
        });
        assert_eq!(
            out,
            vec![DecodedEvent::Thinking {
                content: "Let me ".into(),
                is_complete: false
            }]
        );

        decoder.handle_event(&WireEvent::ContentBlockDelta {
            index: 2,
            delta: BlockDelta::ThinkingDelta {
                thinking: "plan".into(),
            },
        });

        let out = decoder.handle_event(&stop(2));
        assert_eq!(
            out,
            vec![DecodedEvent::Thinking {
                content: "Let me plan".into(),
                is_complete: true
            }]
        );
    }

    #[test]
    fn test_empty_thinking_block_still_emits_final() {
        let mut decoder = BlockDecoder::new();
        let start: WireEvent = serde_json::from_value(json!({
            "type": "content_block_start",
            "index": 0,
            "content_block": {"type": "thinking", "thinking": ""}
        }))
        .unwrap();
        decoder.handle_event(&start);

        let out = decoder.handle_event(&stop(0));
        assert_eq!(
            out,
            vec![DecodedEvent::Thinking {
                content: String::new(),
                is_complete: true
            }]
        );
    }

    #[test]
    fn test_interleaved_blocks_by_index() {
        let mut decoder = BlockDecoder::new();
        let out = decode_all(
            &mut decoder,
            &[
                start_tool(0, "begin_rendering"),
                start_tool(1, "delete_surface"),
                json_delta(1, "{\"surfaceId\":\"old\"}"),
                json_delta(0, "{\"surfaceId\":\"new\"}"),
                stop(1),
                stop(0),
            ],
        );

        // Output order follows block completion order, not start order.
        assert_eq!(out.len(), 2);
        assert!(matches!(
            &out[0],
            DecodedEvent::Message(A2uiMessage::DeleteSurface(m)) if m.surface_id == "old"
        ));
        assert!(matches!(
            &out[1],
            DecodedEvent::Message(A2uiMessage::BeginRendering(m)) if m.surface_id == "new"
        ));
    }

    #[test]
    fn test_input_seeded_from_start_event() {
        let mut decoder = BlockDecoder::new();
        let start: WireEvent = serde_json::from_value(json!({
            "type": "content_block_start",
            "index": 0,
            "content_block": {
                "type": "tool_use",
                "name": "delete_surface",
                "input": {"surfaceId": "s1", "cascade": false}
            }
        }))
        .unwrap();

        let out = decode_all(&mut decoder, &[start, stop(0)]);
        assert!(matches!(
            &out[0],
            DecodedEvent::Message(A2uiMessage::DeleteSurface(m))
                if m.surface_id == "s1" && !m.cascade
        ));
    }

    #[test]
    fn test_reset_clears_open_blocks() {
        let mut decoder = BlockDecoder::new();
        decoder.handle_event(&start_tool(0, "begin_rendering"));
        decoder.handle_event(&json_delta(0, "{\"surfaceId\":\"s1\"}"));
        assert_eq!(decoder.open_blocks(), 1);

        decoder.reset();
        assert_eq!(decoder.open_blocks(), 0);

        // A stop after reset finds nothing to finalize.
        assert!(decoder.handle_event(&stop(0)).is_empty());
    }

    #[test]
    fn test_delta_for_unopened_block_ignored() {
        let mut decoder = BlockDecoder::new();
        assert!(decoder.handle_event(&json_delta(9, "{}")).is_empty());
    }
}
