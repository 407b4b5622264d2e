//! # genui
//!
//! Resilient client for streaming generative-UI LLM responses.
//!
//! genui consumes a token-streaming LLM API over server-sent events
//! and re-emits a normalized event stream for a UI layer: text
//! deltas, reasoning content, and a closed set of structured
//! UI-control messages reconstructed from fragmented tool-call JSON.
//! Every network call runs behind a resilience stack (circuit
//! breaker, retry with backoff, rate-limit cooperation, request
//! deduplication), and a reactive binding engine keeps widget
//! properties synchronized with a shared data model.
//!
//! ## Quick Start
//!
//! ```ignore
//! use genui::prelude::*;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = Arc::new(HttpTransport::new("https://api.example.com", api_key));
//!     let client = GenUiClient::new(transport);
//!
//!     let mut stream = client.stream_request(
//!         ChatRequest::new("model-1").with_message(ChatMessage::user("make a form")),
//!     );
//!     while let Some(event) = stream.next().await {
//!         match event.event {
//!             UiStreamEvent::TextDelta(text) => print!("{text}"),
//!             UiStreamEvent::StructuredMessage(message) => client.apply_message(&message),
//!             UiStreamEvent::Complete => break,
//!             _ => {}
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! genui is organized as a workspace of focused crates:
//!
//! - [`genui_core`] - Error taxonomy, output events, structured messages
//! - [`genui_streaming`] - SSE parsing, wire events, block decoding
//! - [`genui_resilience`] - Retry, circuit breaker, rate limiter, dedup
//! - [`genui_client`] - Transports, stream orchestration, metrics
//! - [`genui_binding`] - Paths, observables, two-way data binding

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;

pub use client::GenUiClient;

// Re-export the member crates.
pub use genui_binding;
pub use genui_client;
pub use genui_core;
pub use genui_resilience;
pub use genui_streaming;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::GenUiClient;
    pub use genui_binding::{BindingPath, BindingRegistry, DataModelStore, Observable};
    pub use genui_client::{
        HandlerConfig, HttpTransport, MetricsCollector, StreamHandler, Transport, UiEventStream,
    };
    pub use genui_core::{
        A2uiMessage, ChatMessage, ChatRequest, GenUiError, TaggedStreamEvent, UiStreamEvent,
        WidgetNode,
    };
    pub use genui_resilience::{
        CircuitBreaker, CircuitBreakerConfig, RateLimiter, RetryPolicy,
    };
    pub use genui_streaming::{BlockDecoder, DecodedEvent, WireEvent};
}
