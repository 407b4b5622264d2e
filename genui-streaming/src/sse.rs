//! Incremental Server-Sent Events parsing.
//!
//! Feeds arbitrary byte chunks and yields complete SSE events as
//! their `\n\n` boundaries arrive. Field handling follows the SSE
//! spec subset the protocol uses: `event`, `data` (multi-line,
//! joined with `\n`), `id`, `retry`, and `:` comments.

use crate::error::{StreamError, StreamResult};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Upper bound on buffered bytes between event boundaries.
const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type, if the server set one.
    pub event: Option<String>,
    /// Data payload; multi-line data is joined with `\n`.
    pub data: String,
    /// Event id, if set.
    pub id: Option<String>,
    /// Reconnection delay hint in milliseconds, if set.
    pub retry: Option<u64>,
}

impl SseEvent {
    /// Create an event with only a data payload.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Whether this is the `[DONE]` end-of-stream sentinel.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE parser.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    ready: VecDeque<SseEvent>,
}

impl SseParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes; invalid UTF-8 is replaced lossily.
    pub fn feed(&mut self, chunk: &Bytes) -> StreamResult<()> {
        let text = String::from_utf8_lossy(chunk);
        self.feed_str(&text)
    }

    /// Feed a chunk of text.
    pub fn feed_str(&mut self, chunk: &str) -> StreamResult<()> {
        self.buffer.push_str(chunk);
        if self.buffer.len() > MAX_BUFFER_SIZE {
            return Err(StreamError::BufferOverflow);
        }
        self.drain_complete_events();
        Ok(())
    }

    /// Flush a trailing event that was never terminated by a blank
    /// line. Call once when the byte stream ends.
    pub fn finish(&mut self) {
        self.drain_complete_events();
        let rest = std::mem::take(&mut self.buffer);
        if !rest.trim().is_empty() {
            if let Some(event) = parse_event_block(&rest) {
                self.ready.push_back(event);
            }
        }
    }

    /// Pop the next complete event.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        self.ready.pop_front()
    }

    /// Discard all buffered state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ready.clear();
    }

    fn drain_complete_events(&mut self) {
        while let Some((end, skip)) = next_boundary(&self.buffer) {
            let block = self.buffer[..end].to_string();
            self.buffer.drain(..end + skip);
            if let Some(event) = parse_event_block(&block) {
                self.ready.push_back(event);
            }
        }
    }
}

/// Find the earliest event boundary (`\n\n` or `\r\n\r\n`), returning
/// the block end offset and the boundary length.
fn next_boundary(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|pos| (pos, 2));
    let crlf = buffer.find("\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Parse one blank-line-delimited block into an event, or `None` when
/// the block carries no data lines (pure comments or metadata).
fn parse_event_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut id = None;
    let mut retry = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data_lines.push(value),
            "id" => id = Some(value.to_string()),
            "retry" => retry = value.trim().parse().ok(),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
        id,
        retry,
    })
}

pin_project! {
    /// Adapter turning a byte stream into a stream of SSE events.
    pub struct SseStream<S> {
        #[pin]
        inner: S,
        parser: SseParser,
        finished: bool,
    }
}

impl<S> SseStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>>,
{
    /// Wrap a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            finished: false,
        }
    }
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>>,
{
    type Item = StreamResult<SseEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.parser.next_event() {
                return Poll::Ready(Some(Ok(event)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if let Err(e) = this.parser.feed(&bytes) {
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(StreamError::Io(e))));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.parser.finish();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
