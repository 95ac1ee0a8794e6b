#![cfg(feature = "provider-openai")]

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use pprovider::adapters::openai::{
    OpenAiAssistantMessage, OpenAiAuth, OpenAiChunkStream, OpenAiFinishReason, OpenAiProvider,
    OpenAiRequest, OpenAiResponse, OpenAiStreamChunk, OpenAiToolCall, OpenAiTransport,
    OpenAiUsage,
};
use pprovider::{
    ChatChunk, Message, ModelConfig, ModelProvider, ModelRequest, ProviderDescriptor,
    ProviderError, ProviderFuture, ProviderId, ProviderRegistry, Role, SecretString, StopReason,
    ToolDefinition, ToolSchema,
};
use serde_json::json;

#[derive(Debug, Default)]
struct FakeTransport {
    captured_auth: Mutex<Option<OpenAiAuth>>,
    captured_requests: Mutex<Vec<OpenAiRequest>>,
    stream_chunks: Vec<OpenAiStreamChunk>,
}

impl FakeTransport {
    fn with_stream(chunks: Vec<OpenAiStreamChunk>) -> Self {
        Self {
            stream_chunks: chunks,
            ..Self::default()
        }
    }

    fn capture(&self, request: OpenAiRequest, auth: OpenAiAuth) {
        self.captured_requests
            .lock()
            .expect("request lock")
            .push(request);
        *self.captured_auth.lock().expect("auth lock") = Some(auth);
    }
}

impl OpenAiTransport for FakeTransport {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            self.capture(request, auth);

            Ok(OpenAiResponse {
                model: "gpt-4o-mini".to_string(),
                message: OpenAiAssistantMessage {
                    content: "hello world".to_string(),
                    tool_calls: vec![OpenAiToolCall {
                        id: "call_1".to_string(),
                        name: "lookup".to_string(),
                        arguments: "{\"id\":1}".to_string(),
                    }],
                },
                finish_reason: OpenAiFinishReason::ToolCalls,
                usage: OpenAiUsage {
                    prompt_tokens: 7,
                    completion_tokens: 3,
                    total_tokens: 10,
                },
            })
        })
    }

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.capture(request, auth);
            let output = futures_util::stream::iter(self.stream_chunks.clone().into_iter().map(Ok));
            Ok(Box::pin(output) as OpenAiChunkStream<'a>)
        })
    }
}

fn registry_with(transport: Arc<FakeTransport>) -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry
        .register(
            ProviderDescriptor::new("openai", "OpenAI (fake)", move |config| {
                let key = config.resolve_api_key("PARLEY_TEST_FAKE_OPENAI_KEY")?;
                Ok(Arc::new(OpenAiProvider::new(
                    Arc::clone(&transport) as Arc<dyn OpenAiTransport>,
                    OpenAiAuth::ApiKey(key),
                )) as Arc<dyn ModelProvider>)
            })
            .with_streaming(true),
        )
        .expect("register");
    registry
}

#[tokio::test]
async fn complete_maps_openai_response_to_provider_response() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(
        transport.clone(),
        OpenAiAuth::ApiKey(SecretString::new("sk-live-123")),
    );
    let request = ModelRequest::new("gpt-4o", vec![Message::new(Role::User, "hi")]).with_tools(
        vec![ToolDefinition::new(
            "lookup",
            "Look up ID",
            ToolSchema::new().required_property("id", json!({"type": "integer"})),
        )],
    );

    let response = provider
        .complete(request)
        .await
        .expect("completion should succeed");
    assert_eq!(response.provider, ProviderId::new("openai"));
    assert_eq!(response.stop_reason, StopReason::ToolUse);
    assert_eq!(response.usage.total_tokens, 10);
    assert_eq!(response.text(), "hello world");
    assert_eq!(response.tool_calls()[0].name, "lookup");

    let auth = transport
        .captured_auth
        .lock()
        .expect("auth lock")
        .clone()
        .expect("auth should be captured");
    assert_eq!(auth, OpenAiAuth::ApiKey(SecretString::new("sk-live-123")));

    let requests = transport.captured_requests.lock().expect("request lock");
    assert_eq!(requests[0].model, "gpt-4o");
    assert_eq!(requests[0].tools[0].parameters["required"], json!(["id"]));
    assert!(!requests[0].stream);
}

#[tokio::test]
async fn registry_chat_passes_config_options_to_transport() {
    let transport = Arc::new(FakeTransport::default());
    let registry = registry_with(Arc::clone(&transport));
    registry
        .set_active(
            ModelConfig::new("openai", "gpt-4o")
                .with_api_key("sk-inline")
                .with_max_tokens(200)
                .with_temperature(0.2),
        )
        .expect("activate");

    registry
        .chat(vec![Message::new(Role::User, "hi")], Vec::new())
        .await
        .expect("chat should succeed");

    let requests = transport.captured_requests.lock().expect("request lock");
    assert_eq!(requests[0].max_tokens, Some(200));
    assert_eq!(requests[0].temperature, Some(0.2));
}

#[tokio::test]
async fn native_stream_forwards_deltas_and_done() {
    let transport = Arc::new(FakeTransport::with_stream(vec![
        OpenAiStreamChunk::TextDelta("hel".to_string()),
        OpenAiStreamChunk::TextDelta("lo".to_string()),
        OpenAiStreamChunk::MessageComplete(OpenAiAssistantMessage {
            content: "hello".to_string(),
            tool_calls: Vec::new(),
        }),
        OpenAiStreamChunk::ResponseComplete(OpenAiResponse {
            model: "gpt-4o".to_string(),
            message: OpenAiAssistantMessage {
                content: "hello".to_string(),
                tool_calls: Vec::new(),
            },
            finish_reason: OpenAiFinishReason::Stop,
            usage: OpenAiUsage::default(),
        }),
    ]));
    let registry = registry_with(Arc::clone(&transport));
    registry
        .set_active(ModelConfig::new("openai", "gpt-4o").with_api_key("sk-inline"))
        .expect("activate");

    let chunks = registry
        .stream_chat(vec![Message::new(Role::User, "hi")], Vec::new())
        .expect("stream should open")
        .map(|item| item.expect("chunk should be ok"))
        .collect::<Vec<_>>()
        .await;

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], ChatChunk::Delta("hel".to_string()));
    assert_eq!(chunks[1], ChatChunk::Delta("lo".to_string()));
    match &chunks[2] {
        ChatChunk::Done(response) => {
            assert_eq!(response.text(), "hello");
            assert_eq!(response.stop_reason, StopReason::EndTurn);
        }
        other => panic!("unexpected chunk: {other:?}"),
    }

    assert!(transport.captured_requests.lock().expect("request lock")[0].stream);
}

#[tokio::test]
async fn native_stream_without_completion_synthesizes_done() {
    let transport = Arc::new(FakeTransport::with_stream(vec![
        OpenAiStreamChunk::TextDelta("partial ".to_string()),
        OpenAiStreamChunk::TextDelta("answer".to_string()),
    ]));
    let registry = registry_with(transport);
    registry
        .set_active(ModelConfig::new("openai", "gpt-4o").with_api_key("sk-inline"))
        .expect("activate");

    let chunks = registry
        .stream_chat(vec![Message::new(Role::User, "hi")], Vec::new())
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await;

    let last = chunks
        .last()
        .cloned()
        .expect("stream should not be empty")
        .expect("last chunk should be ok");
    match last {
        ChatChunk::Done(response) => assert_eq!(response.text(), "partial answer"),
        other => panic!("unexpected chunk: {other:?}"),
    }
}

#[tokio::test]
async fn aborting_stream_stops_delivery() {
    let transport = Arc::new(FakeTransport::with_stream(vec![
        OpenAiStreamChunk::TextDelta("one".to_string()),
        OpenAiStreamChunk::TextDelta("two".to_string()),
    ]));
    let registry = registry_with(transport);
    registry
        .set_active(ModelConfig::new("openai", "gpt-4o").with_api_key("sk-inline"))
        .expect("activate");

    let mut stream = registry
        .stream_chat(vec![Message::new(Role::User, "hi")], Vec::new())
        .expect("stream should open");
    let first = stream.next().await.expect("first chunk").expect("ok");
    assert_eq!(first, ChatChunk::Delta("one".to_string()));

    stream.abort_handle().abort();
    assert!(stream.next().await.is_none());
}
