//! # genui-streaming
//!
//! Wire protocol events, SSE parsing, and block decoding for genui.
//!
//! This crate turns a raw byte or event stream from the transport
//! into decoded output: SSE framing first, then the tagged wire
//! events, then block reconstruction that buffers fragmented
//! tool-call JSON until each block closes.
//!
//! ## Core Concepts
//!
//! - **[`SseParser`] / [`SseStream`]**: incremental SSE framing
//! - **[`WireEvent`]**: the tagged raw protocol event union
//! - **[`BlockDecoder`]**: start/delta/stop reconstruction with
//!   per-index buffering and silent drop of undecodable blocks
//!
//! ## Example
//!
//! ```ignore
//! use genui_streaming::{BlockDecoder, WireEvent};
//!
//! let mut decoder = BlockDecoder::new();
//! for raw in wire_events {
//!     if let Some(event) = WireEvent::from_raw(&raw) {
//!         for decoded in decoder.handle_event(&event) {
//!             println!("{:?}", decoded);
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decoder;
pub mod error;
pub mod sse;
pub mod wire;

// Re-exports
pub use decoder::{BlockDecoder, DecodedEvent};
pub use error::{StreamError, StreamResult};
pub use sse::{SseEvent, SseParser, SseStream};
pub use wire::{
    BlockDelta, ContentBlockInfo, MessageDeltaInfo, MessageStartInfo, UsageInfo, WireEvent,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        BlockDecoder, DecodedEvent, SseEvent, SseParser, SseStream, StreamError, StreamResult,
        UsageInfo, WireEvent,
    };
}
