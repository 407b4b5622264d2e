//! Transport layer.
//!
//! The stream handler talks to the model API only through the
//! [`Transport`] trait, which yields raw protocol event maps. The
//! HTTP implementation is a thin adapter: connection setup, status
//! classification, and SSE framing, nothing else. Vendor-specific
//! marshalling stays out of the orchestrator this way and the whole
//! network edge can be swapped for [`MockTransport`] in tests.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use genui_core::errors::{GenUiError, NetworkError, Result, TimeoutError};
use genui_core::request::ChatRequest;
use genui_resilience::parse_retry_after;
use genui_streaming::SseStream;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::warn;

/// Stream of raw protocol event maps.
pub type RawEventStream = Pin<Box<dyn Stream<Item = Result<JsonValue>> + Send>>;

/// A capability that turns a request into raw protocol events.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a streaming call. Fatal setup failures return `Err`;
    /// recoverable failures may instead appear as `{type:"error"}`
    /// events inside the stream.
    async fn create_stream(&self, request: &ChatRequest) -> Result<RawEventStream>;

    /// Execute a non-streaming call, returning the full response body.
    async fn send(&self, request: &ChatRequest) -> Result<JsonValue>;
}

/// HTTP transport over a server-sent-events endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport for the given endpoint. The API key is
    /// passed through as a bearer token on every call.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Use a preconfigured reqwest client (timeouts, proxies).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    async fn post(&self, request: &ChatRequest, streaming: bool) -> Result<reqwest::Response> {
        let mut body = serde_json::to_value(request)?;
        body["stream"] = JsonValue::Bool(streaming);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok()),
            );
            let body = response.text().await.unwrap_or_default();
            return Err(GenUiError::from_status(status.as_u16(), body, retry_after));
        }
        Ok(response)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GenUiError {
    if e.is_timeout() {
        TimeoutError::request(Duration::ZERO).into()
    } else {
        NetworkError::new(e.to_string()).into()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_stream(&self, request: &ChatRequest) -> Result<RawEventStream> {
        let response = self.post(request, true).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));

        let events = SseStream::new(bytes)
            .take_while(|item| {
                let done = matches!(item, Ok(event) if event.is_done());
                futures::future::ready(!done)
            })
            .filter_map(|item| async move {
                match item {
                    Ok(event) => match serde_json::from_str::<JsonValue>(&event.data) {
                        Ok(value) => Some(Ok(value)),
                        Err(e) => {
                            warn!(error = %e, "skipping non-JSON SSE payload");
                            None
                        }
                    },
                    Err(e) => Some(Err(NetworkError::new(e.to_string()).into())),
                }
            });

        Ok(Box::pin(events))
    }

    async fn send(&self, request: &ChatRequest) -> Result<JsonValue> {
        let response = self.post(request, false).await?;
        response
            .json::<JsonValue>()
            .await
            .map_err(map_reqwest_error)
    }
}

/// One scripted transport attempt for [`MockTransport`].
#[derive(Debug)]
pub enum MockAttempt {
    /// A stream that yields these raw maps, then ends.
    Events(Vec<JsonValue>),
    /// A stream that yields these raw maps, then fails mid-stream.
    EventsThenError(Vec<JsonValue>, GenUiError),
    /// Stream setup fails outright.
    Failure(GenUiError),
    /// A stream that opens but never yields.
    Hang,
}

/// Scripted in-memory transport for tests.
///
/// Each `create_stream` call consumes the next scripted attempt;
/// each `send` call consumes the next scripted response.
#[derive(Debug, Default)]
pub struct MockTransport {
    attempts: Mutex<VecDeque<MockAttempt>>,
    send_responses: Mutex<VecDeque<Result<JsonValue>>>,
    send_delay: Duration,
    stream_calls: AtomicU32,
    send_calls: AtomicU32,
}

impl MockTransport {
    /// Create a transport with no scripted behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next streaming attempt.
    #[must_use]
    pub fn with_attempt(self, attempt: MockAttempt) -> Self {
        self.attempts.lock().push_back(attempt);
        self
    }

    /// Script the next non-streaming response.
    #[must_use]
    pub fn with_send_response(self, response: Result<JsonValue>) -> Self {
        self.send_responses.lock().push_back(response);
        self
    }

    /// Delay each `send` by this long (visible under a paused clock).
    #[must_use]
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// How many times `create_stream` was called.
    #[must_use]
    pub fn stream_calls(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }

    /// How many times `send` was called.
    #[must_use]
    pub fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_stream(&self, _request: &ChatRequest) -> Result<RawEventStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let attempt = self
            .attempts
            .lock()
            .pop_front()
            .unwrap_or(MockAttempt::Events(Vec::new()));

        match attempt {
            MockAttempt::Events(events) => {
                Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
            }
            MockAttempt::EventsThenError(events, error) => Ok(Box::pin(
                stream::iter(events.into_iter().map(Ok)).chain(stream::iter([Err(error)])),
            )),
            MockAttempt::Failure(error) => Err(error),
            MockAttempt::Hang => Ok(Box::pin(stream::pending::<Result<JsonValue>>())),
        }
    }

    async fn send(&self, _request: &ChatRequest) -> Result<JsonValue> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.send_responses
            .lock()
            .pop_front()
            .unwrap_or(Ok(JsonValue::Object(serde_json::Map::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genui_core::request::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest::new("test-model").with_message(ChatMessage::user("hi"))
    }

    #[tokio::test]
    async fn test_http_stream_parses_sse_events() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"m1\"}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("authorization", "Bearer key-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "key-1");
        let events: Vec<JsonValue> = transport
            .create_stream(&request())
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["type"], "message_start");
        assert_eq!(events[1]["type"], "message_stop");
    }

    #[tokio::test]
    async fn test_http_classifies_429_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "3")
                    .set_body_string("slow down"),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "key-1");
        let err = transport.create_stream(&request()).await.err().unwrap();
        assert!(err.is_rate_limit());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_http_classifies_auth_and_server_errors() {
        for (status, want_retryable) in [(401u16, false), (500u16, true), (422u16, false)] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let transport = HttpTransport::new(server.uri(), "key-1");
            let err = transport.send(&request()).await.unwrap_err();
            assert_eq!(err.is_retryable(), want_retryable, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_mock_transport_scripts_attempts() {
        let transport = MockTransport::new()
            .with_attempt(MockAttempt::Failure(
                genui_core::errors::ServerError::new(500, "boom").into(),
            ))
            .with_attempt(MockAttempt::Events(vec![serde_json::json!({
                "type": "message_stop"
            })]));

        assert!(transport.create_stream(&request()).await.is_err());
        let events: Vec<_> = transport
            .create_stream(&request())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(transport.stream_calls(), 2);
    }
}
