//! # genui-core
//!
//! Core types, messages, and error handling for genui.
//!
//! This crate defines the shared vocabulary of the workspace: the
//! error taxonomy that drives retry classification, the normalized
//! output event union consumed by UI layers, the closed set of
//! structured UI-control messages with their widget tree, and the
//! parser that turns completed tool calls into those messages.
//!
//! ## Core Concepts
//!
//! - **[`GenUiError`]**: error taxonomy with fixed retryability
//! - **[`UiStreamEvent`]**: normalized output events
//! - **[`A2uiMessage`]**: the four structured UI-control message kinds
//! - **[`parse_tool_use`] / [`parse_full_message`]**: tool-call and
//!   full-response parsing
//! - **[`IdGenerator`]**: injectable request-id source

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod identifier;
pub mod messages;
pub mod parser;
pub mod request;

// Re-exports
pub use errors::{
    AuthenticationError, CircuitOpenError, GenUiError, MessageParseError, NetworkError,
    RateLimitError, Result, ServerError, TimeoutError, TimeoutKind, ValidationError,
};
pub use events::{TaggedStreamEvent, UiStreamEvent};
pub use identifier::{
    generate_request_id, generate_surface_id, IdGenerator, SequentialIdGenerator, UuidIdGenerator,
};
pub use messages::{
    A2uiMessage, BeginRendering, BindingMode, DataBindingSpec, DataModelUpdate, DeleteSurface,
    PropertyBinding, SurfaceUpdate, WidgetChild, WidgetNode,
};
pub use parser::{is_known_tool, parse_full_message, parse_tool_use, ParsedResponse, KNOWN_TOOLS};
pub use request::{ChatMessage, ChatRequest, Role};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        A2uiMessage, ChatMessage, ChatRequest, GenUiError, Result, TaggedStreamEvent,
        UiStreamEvent, WidgetNode,
    };
}
