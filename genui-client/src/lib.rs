//! # genui-client
//!
//! Stream orchestration, transports, and metrics for genui.
//!
//! The [`StreamHandler`] is the composition point of the workspace:
//! it takes a request, obtains a raw event stream from a
//! [`Transport`], gates the call through the resilience stack, runs
//! the block decoder over the wire events, and emits the normalized
//! output sequence the UI layer consumes. A [`MetricsCollector`]
//! observes every lifecycle transition.
//!
//! ## Example
//!
//! ```ignore
//! use genui_client::{HttpTransport, StreamHandler};
//! use genui_core::{ChatMessage, ChatRequest};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HttpTransport::new("https://api.example.com", api_key));
//! let handler = StreamHandler::new(transport);
//!
//! let mut stream = handler.stream_request(
//!     ChatRequest::new("model-1").with_message(ChatMessage::user("make a form")),
//! );
//! while let Some(event) = stream.next().await {
//!     println!("{}", event.event);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod handler;
pub mod metrics;
pub mod transport;

// Re-exports
pub use handler::{HandlerConfig, StreamHandler, UiEventStream};
pub use metrics::{MetricEvent, MetricsCollector, MetricsSnapshot};
pub use transport::{HttpTransport, MockAttempt, MockTransport, RawEventStream, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        HandlerConfig, HttpTransport, MetricEvent, MetricsCollector, MetricsSnapshot,
        StreamHandler, Transport, UiEventStream,
    };
}
