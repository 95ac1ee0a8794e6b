//! Client for OpenAI-compatible chat completion backends.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;

use crate::{
    BoxedEventStream, Message, ModelProvider, ModelRequest, ModelResponse, ProviderError,
    ProviderFuture, ProviderId, Role, StreamEvent,
};

use super::transport::OpenAiTransport;
use super::types::{OpenAiAuth, OpenAiMessage, OpenAiRequest, OpenAiStreamChunk, OpenAiTool};

pub const OPENAI: &str = "openai";

/// Drives any backend that speaks the chat-completions wire format.
///
/// The reported provider id is configurable so Anthropic and Ollama reuse this
/// client against their compatible endpoints.
#[derive(Clone)]
pub struct OpenAiProvider {
    id: ProviderId,
    transport: Arc<dyn OpenAiTransport>,
    auth: OpenAiAuth,
    fallback_model: String,
}

impl OpenAiProvider {
    pub fn new(transport: Arc<dyn OpenAiTransport>, auth: OpenAiAuth) -> Self {
        Self {
            id: ProviderId::new(OPENAI),
            transport,
            auth,
            fallback_model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn with_provider_id(mut self, id: impl Into<ProviderId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub(crate) fn build_openai_request(&self, request: ModelRequest, stream: bool) -> OpenAiRequest {
        let model = if request.model.trim().is_empty() {
            self.fallback_model.clone()
        } else {
            request.model
        };

        OpenAiRequest {
            model,
            messages: request
                .messages
                .into_iter()
                .map(OpenAiMessage::from)
                .collect(),
            tools: request.tools.into_iter().map(OpenAiTool::from).collect(),
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream,
        }
    }

    fn map_chunk(&self, chunk: OpenAiStreamChunk) -> StreamEvent {
        match chunk {
            OpenAiStreamChunk::TextDelta(delta) => StreamEvent::TextDelta(delta),
            OpenAiStreamChunk::ToolCallDelta(tool_call) => {
                StreamEvent::ToolCallDelta(tool_call.into())
            }
            OpenAiStreamChunk::MessageComplete(message) => {
                StreamEvent::MessageComplete(Message::new(Role::Assistant, message.content))
            }
            OpenAiStreamChunk::ResponseComplete(response) => {
                StreamEvent::ResponseComplete(response.into_model_response(self.id.clone()))
            }
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("auth", &self.auth)
            .field("fallback_model", &self.fallback_model)
            .finish()
    }
}

impl ModelProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let openai_request = self.build_openai_request(request, false);
            let response = self
                .transport
                .complete(openai_request, self.auth.clone())
                .await?;
            Ok(response.into_model_response(self.id.clone()))
        })
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let openai_request = self.build_openai_request(request, true);
            let mut chunks = self
                .transport
                .stream(openai_request, self.auth.clone())
                .await?;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    yield self.map_chunk(chunk?);
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}
