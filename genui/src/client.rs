//! High-level client.
//!
//! Wires the handler, the resilience stack, and the binding engine
//! together with sensible defaults, for callers that do not need to
//! assemble the pieces themselves.

use genui_binding::{BindingRegistry, DataModelStore};
use genui_client::{HandlerConfig, MetricsCollector, StreamHandler, Transport, UiEventStream};
use genui_core::messages::A2uiMessage;
use genui_core::parser::ParsedResponse;
use genui_core::request::ChatRequest;
use genui_resilience::{CircuitBreaker, SharedResult};
use std::sync::Arc;

/// Default bound on cached derived observables.
const DEFAULT_TRANSFORM_CACHE_SIZE: usize = 64;

/// One-stop client: stream handler plus binding engine.
pub struct GenUiClient {
    handler: StreamHandler,
    store: DataModelStore,
    registry: Arc<BindingRegistry>,
}

impl GenUiClient {
    /// Create a client over a transport with default resilience
    /// components.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let store = DataModelStore::new();
        let registry = Arc::new(BindingRegistry::new(
            store.clone(),
            DEFAULT_TRANSFORM_CACHE_SIZE,
        ));
        Self {
            handler: StreamHandler::new(transport),
            store,
            registry,
        }
    }

    /// Replace the handler config.
    #[must_use]
    pub fn with_config(mut self, config: HandlerConfig) -> Self {
        self.handler = self.handler.with_config(config);
        self
    }

    /// Stream a request as normalized UI events.
    pub fn stream_request(&self, request: ChatRequest) -> UiEventStream {
        self.handler.stream_request(request)
    }

    /// Execute a non-streaming request.
    pub async fn send_request(&self, request: &ChatRequest) -> SharedResult<ParsedResponse> {
        self.handler.send_request(request).await
    }

    /// Apply a structured message's side effects to the shared state
    /// this client owns: data-model updates land in the store, and a
    /// surface delete tears down the surface's bindings.
    ///
    /// Rendering messages are returned to the caller untouched; the
    /// widget layer owns those.
    pub fn apply_message(&self, message: &A2uiMessage) {
        match message {
            A2uiMessage::DataModelUpdate(update) => self.store.apply_update(update),
            A2uiMessage::DeleteSurface(delete) => {
                self.registry.remove_surface(&delete.surface_id);
            }
            A2uiMessage::BeginRendering(_) | A2uiMessage::SurfaceUpdate(_) => {}
        }
    }

    /// The shared data model.
    #[must_use]
    pub fn store(&self) -> &DataModelStore {
        &self.store
    }

    /// The binding registry.
    #[must_use]
    pub fn bindings(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// Lifecycle metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.handler.metrics()
    }

    /// The circuit breaker gating this client's calls.
    #[must_use]
    pub fn circuit_breaker(&self) -> Arc<CircuitBreaker> {
        self.handler.circuit_breaker()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use genui_binding::BindingPath;
    use genui_client::{MockAttempt, MockTransport};
    use genui_core::events::UiStreamEvent;
    use genui_core::request::ChatMessage;
    use serde_json::json;

    fn request() -> ChatRequest {
        ChatRequest::new("test-model").with_message(ChatMessage::user("build a counter"))
    }

    #[tokio::test]
    async fn test_stream_and_apply_data_model_update() {
        let events = vec![
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "tool_use", "id": "t1", "name": "data_model_update", "input": {}}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "input_json_delta", "partial_json": "{\"updates\": {\"counter.value\": 5}}"}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "message_stop"}),
        ];
        let transport = Arc::new(MockTransport::new().with_attempt(MockAttempt::Events(events)));
        let client = GenUiClient::new(transport);

        let mut stream = client.stream_request(request());
        while let Some(event) = stream.next().await {
            if let UiStreamEvent::StructuredMessage(message) = &event.event {
                client.apply_message(message);
            }
        }

        assert_eq!(
            client.store().get(&BindingPath::parse("counter.value").unwrap()),
            json!(5)
        );
    }

    #[tokio::test]
    async fn test_delete_surface_tears_down_bindings() {
        let transport = Arc::new(MockTransport::new());
        let client = GenUiClient::new(transport);

        let widget: genui_core::messages::WidgetNode = serde_json::from_value(json!({
            "type": "slider",
            "id": "w1",
            "dataBinding": "settings.volume"
        }))
        .unwrap();
        client.bindings().bind_widget("s1", &widget).unwrap();
        assert_eq!(client.bindings().binding_count(), 1);

        let message: A2uiMessage =
            serde_json::from_value(json!({"type": "delete_surface", "surfaceId": "s1"})).unwrap();
        client.apply_message(&message);
        assert_eq!(client.bindings().binding_count(), 0);
    }
}
