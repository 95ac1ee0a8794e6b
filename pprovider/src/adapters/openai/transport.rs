//! OpenAI transport trait and reqwest-based HTTP implementation.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};

use crate::{ProviderError, ProviderFuture};

use super::serde_api::{
    OpenAiApiResponse, OpenAiApiStreamResponse, build_api_request, extract_error_message,
    parse_finish_reason,
};
use super::types::{
    OpenAiAssistantMessage, OpenAiAuth, OpenAiFinishReason, OpenAiRequest, OpenAiResponse,
    OpenAiStreamChunk, OpenAiToolCall, OpenAiUsage,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub type OpenAiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<OpenAiStreamChunk, ProviderError>> + Send + 'a>>;

pub trait OpenAiTransport: Send + Sync + std::fmt::Debug {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>>;

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Builds a client honoring an optional whole-request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|err| ProviderError::transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self::new(client))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn apply_auth(
        &self,
        builder: reqwest::RequestBuilder,
        auth: &OpenAiAuth,
    ) -> reqwest::RequestBuilder {
        match auth {
            OpenAiAuth::ApiKey(key) => builder.bearer_auth(key.expose()),
            OpenAiAuth::None => builder,
        }
    }

    async fn send(
        &self,
        request: OpenAiRequest,
        auth: &OpenAiAuth,
    ) -> Result<Response, ProviderError> {
        let api_request = build_api_request(request)?;
        let builder = self
            .client
            .post(self.endpoint("chat/completions"))
            .json(&api_request);

        let response = self
            .apply_auth(builder, auth)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("request failed with status {status}"));

        error_for_status(status, message)
    }
}

pub(crate) fn error_for_status(status: StatusCode, message: String) -> ProviderError {
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::authentication(message).with_status(code)
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message).with_status(code),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::timeout(message).with_status(code)
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            ProviderError::unavailable(message).with_status(code)
        }
        _ => ProviderError::upstream(code, message),
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(err.to_string())
    } else {
        ProviderError::transport(err.to_string())
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn complete<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            request.stream = false;
            let response = self.send(request, &auth).await?;
            let parsed: OpenAiApiResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::transport(err.to_string()))?;

            OpenAiResponse::try_from(parsed)
        })
    }

    fn stream<'a>(
        &'a self,
        mut request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.stream = true;
            let fallback_model = request.model.clone();
            let response = self.send(request, &auth).await?;

            let stream = try_stream! {
                let mut bytes = response.bytes_stream();
                let mut lines = SseLineBuffer::default();
                let mut accumulator = StreamAccumulator::new(fallback_model);

                'read: while let Some(item) = bytes.next().await {
                    let chunk = item.map_err(|err| ProviderError::transport(err.to_string()))?;
                    for event in lines.push(&chunk)? {
                        match event {
                            SseEvent::Done => break 'read,
                            SseEvent::Data(payload) => {
                                for output in accumulator.push_payload(&payload)? {
                                    yield output;
                                }
                            }
                        }
                    }
                }

                for output in accumulator.finish() {
                    yield output;
                }
            };

            Ok(Box::pin(stream) as OpenAiChunkStream<'a>)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseEvent {
    Data(String),
    Done,
}

/// Splits a server-sent-event byte stream into `data:` payloads.
///
/// Bytes are buffered until a newline so multi-byte characters split across
/// network chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, ProviderError> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(newline) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line = self.pending.drain(..=newline).collect::<Vec<_>>();
            let line = std::str::from_utf8(&line)
                .map_err(|err| ProviderError::transport(format!("invalid UTF-8 in stream: {err}")))?
                .trim();

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };

            let payload = payload.trim();
            if payload == "[DONE]" {
                events.push(SseEvent::Done);
            } else if !payload.is_empty() {
                events.push(SseEvent::Data(payload.to_string()));
            }
        }

        Ok(events)
    }
}

/// Folds streamed completion deltas into the final assistant message.
#[derive(Debug)]
pub(crate) struct StreamAccumulator {
    fallback_model: String,
    model: Option<String>,
    content: String,
    tool_calls: BTreeMap<u32, OpenAiToolCall>,
    finish_reason: OpenAiFinishReason,
    usage: OpenAiUsage,
}

impl StreamAccumulator {
    pub(crate) fn new(fallback_model: String) -> Self {
        Self {
            fallback_model,
            model: None,
            content: String::new(),
            tool_calls: BTreeMap::new(),
            finish_reason: OpenAiFinishReason::Other,
            usage: OpenAiUsage::default(),
        }
    }

    pub(crate) fn push_payload(
        &mut self,
        payload: &str,
    ) -> Result<Vec<OpenAiStreamChunk>, ProviderError> {
        let parsed: OpenAiApiStreamResponse = serde_json::from_str(payload)
            .map_err(|err| ProviderError::transport(format!("malformed stream payload: {err}")))?;

        if self.model.is_none() {
            self.model = parsed.model.filter(|model| !model.is_empty());
        }

        if let Some(usage) = parsed.usage {
            self.usage = usage.into();
        }

        let mut outputs = Vec::new();
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Ok(outputs);
        };

        if let Some(delta) = choice.delta.content
            && !delta.is_empty()
        {
            self.content.push_str(&delta);
            outputs.push(OpenAiStreamChunk::TextDelta(delta));
        }

        for delta_call in choice.delta.tool_calls.unwrap_or_default() {
            let index = delta_call.index.unwrap_or(0);
            let entry = self
                .tool_calls
                .entry(index)
                .or_insert_with(|| OpenAiToolCall {
                    id: format!("tool_call_{index}"),
                    name: String::new(),
                    arguments: String::new(),
                });

            if let Some(id) = delta_call.id {
                entry.id = id;
            }

            if let Some(function) = delta_call.function {
                if let Some(name) = function.name {
                    entry.name = name;
                }
                if let Some(arguments) = function.arguments {
                    entry.arguments.push_str(&arguments);
                }
            }

            outputs.push(OpenAiStreamChunk::ToolCallDelta(entry.clone()));
        }

        if choice.finish_reason.is_some() {
            self.finish_reason = parse_finish_reason(choice.finish_reason.as_deref());
        }

        Ok(outputs)
    }

    pub(crate) fn finish(self) -> Vec<OpenAiStreamChunk> {
        let message = OpenAiAssistantMessage {
            content: self.content,
            tool_calls: self.tool_calls.into_values().collect(),
        };

        vec![
            OpenAiStreamChunk::MessageComplete(message.clone()),
            OpenAiStreamChunk::ResponseComplete(OpenAiResponse {
                model: self.model.unwrap_or(self.fallback_model),
                message,
                finish_reason: self.finish_reason,
                usage: self.usage,
            }),
        ]
    }
}
