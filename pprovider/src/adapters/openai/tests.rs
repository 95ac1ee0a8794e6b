//! Focused unit tests for OpenAI adapter internals.

#![cfg(test)]

use std::sync::Arc;

use futures_util::stream;
use reqwest::StatusCode;
use serde_json::json;

use crate::{
    Message, ModelRequest, ProviderError, ProviderErrorKind, ProviderFuture, Role, ToolCall,
    ToolDefinition, ToolSchema,
};

use super::provider::OpenAiProvider;
use super::serde_api::{build_api_request, parse_finish_reason};
use super::transport::{
    OpenAiChunkStream, OpenAiTransport, SseEvent, SseLineBuffer, StreamAccumulator,
    error_for_status,
};
use super::types::{
    OpenAiAuth, OpenAiFinishReason, OpenAiRequest, OpenAiResponse, OpenAiRole, OpenAiStreamChunk,
};

#[derive(Debug)]
struct NoopTransport;

impl OpenAiTransport for NoopTransport {
    fn complete<'a>(
        &'a self,
        _request: OpenAiRequest,
        _auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async { Err(ProviderError::other("not used")) })
    }

    fn stream<'a>(
        &'a self,
        _request: OpenAiRequest,
        _auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async {
            let output = stream::iter(vec![Err(ProviderError::other("not used"))]);
            Ok(Box::pin(output) as OpenAiChunkStream<'a>)
        })
    }
}

fn provider() -> OpenAiProvider {
    OpenAiProvider::new(Arc::new(NoopTransport), OpenAiAuth::None)
}

#[test]
fn build_openai_request_keeps_tool_call_linkage() {
    let request = ModelRequest::new(
        "gpt-4o-mini",
        vec![
            Message::new(Role::User, "what time is it"),
            Message::new(Role::Assistant, "")
                .with_tool_calls(vec![ToolCall::new("call_1", "get_time", "{}")]),
            Message::tool_result("call_1", "{\"success\":true}"),
        ],
    );

    let built = provider().build_openai_request(request, false);
    assert_eq!(built.messages.len(), 3);
    assert_eq!(built.messages[1].tool_calls[0].id, "call_1");
    assert_eq!(built.messages[2].role, OpenAiRole::Tool);
    assert_eq!(built.messages[2].tool_call_id.as_deref(), Some("call_1"));
}

#[test]
fn blank_model_uses_fallback() {
    let request = ModelRequest::new("  ", vec![Message::new(Role::User, "hi")]);
    let built = provider()
        .with_fallback_model("gpt-4.1-mini")
        .build_openai_request(request, true);
    assert_eq!(built.model, "gpt-4.1-mini");
    assert!(built.stream);
}

#[test]
fn api_request_serializes_tools_and_null_assistant_content() {
    let request = ModelRequest::new(
        "gpt-4o-mini",
        vec![
            Message::new(Role::User, "hi"),
            Message::new(Role::Assistant, "")
                .with_tool_calls(vec![ToolCall::new("call_9", "lookup", "{\"id\":1}")]),
            Message::tool_result("call_9", "{\"success\":true,\"data\":1}"),
        ],
    )
    .with_tools(vec![ToolDefinition::new(
        "lookup",
        "Look up a record",
        ToolSchema::new().required_property("id", json!({"type": "integer"})),
    )]);

    let built = provider().build_openai_request(request, false);
    let api = build_api_request(built).expect("request should build");
    let value = serde_json::to_value(&api).expect("request should serialize");

    assert_eq!(value["tools"][0]["type"], "function");
    assert_eq!(value["tools"][0]["function"]["parameters"]["required"], json!(["id"]));
    assert!(value["messages"][1]["content"].is_null());
    assert_eq!(value["messages"][1]["tool_calls"][0]["function"]["name"], "lookup");
    assert_eq!(value["messages"][2]["tool_call_id"], "call_9");
    assert!(value.get("temperature").is_none());
}

#[test]
fn api_request_rejects_empty_user_content() {
    let built = provider().build_openai_request(
        ModelRequest::new("gpt-4o-mini", vec![Message::new(Role::User, "  ")]),
        false,
    );
    let error = build_api_request(built).expect_err("empty content should fail");
    assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
}

#[test]
fn parse_finish_reason_maps_expected_values() {
    assert_eq!(parse_finish_reason(Some("stop")), OpenAiFinishReason::Stop);
    assert_eq!(
        parse_finish_reason(Some("length")),
        OpenAiFinishReason::Length
    );
    assert_eq!(
        parse_finish_reason(Some("tool_calls")),
        OpenAiFinishReason::ToolCalls
    );
    assert_eq!(
        parse_finish_reason(Some("unknown")),
        OpenAiFinishReason::Other
    );
    assert_eq!(parse_finish_reason(None), OpenAiFinishReason::Other);
}

#[test]
fn status_codes_map_to_upstream_error_kinds() {
    let auth = error_for_status(StatusCode::UNAUTHORIZED, "bad key".to_string());
    assert_eq!(auth.kind, ProviderErrorKind::Authentication);
    assert_eq!(auth.status, Some(401));

    let limited = error_for_status(StatusCode::TOO_MANY_REQUESTS, "slow".to_string());
    assert_eq!(limited.kind, ProviderErrorKind::RateLimited);

    let rejected = error_for_status(StatusCode::BAD_REQUEST, "bad schema".to_string());
    assert_eq!(rejected.kind, ProviderErrorKind::Upstream);
    assert_eq!(rejected.status, Some(400));
    assert_eq!(rejected.message, "bad schema");
    assert!(rejected.is_upstream());
}

#[test]
fn sse_buffer_handles_split_lines_and_done_marker() {
    let mut buffer = SseLineBuffer::default();
    let first = buffer
        .push(b"data: {\"a\":1}\n\nda")
        .expect("first push should parse");
    assert_eq!(first, vec![SseEvent::Data("{\"a\":1}".to_string())]);

    let second = buffer
        .push(b"ta: [DONE]\n")
        .expect("second push should parse");
    assert_eq!(second, vec![SseEvent::Done]);
}

#[test]
fn sse_buffer_joins_multibyte_characters_across_chunks() {
    let line = "data: {\"c\":\"é\"}\n".as_bytes();
    let split = line.len() - 4;
    let mut buffer = SseLineBuffer::default();

    assert!(buffer.push(&line[..split]).expect("partial").is_empty());
    let events = buffer.push(&line[split..]).expect("rest");
    assert_eq!(events, vec![SseEvent::Data("{\"c\":\"é\"}".to_string())]);
}

#[test]
fn accumulator_folds_text_and_tool_call_deltas() {
    let mut accumulator = StreamAccumulator::new("fallback".to_string());

    let text = accumulator
        .push_payload(r#"{"model":"gpt-4o","choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#)
        .expect("text delta");
    assert_eq!(text, vec![OpenAiStreamChunk::TextDelta("Hel".to_string())]);

    accumulator
        .push_payload(r#"{"choices":[{"delta":{"content":"lo"},"finish_reason":null}]}"#)
        .expect("text delta");
    accumulator
        .push_payload(r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_time","arguments":"{"}}]},"finish_reason":null}]}"#)
        .expect("tool delta");
    accumulator
        .push_payload(r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"}"}}]},"finish_reason":"tool_calls"}]}"#)
        .expect("tool delta");

    let finished = accumulator.finish();
    match &finished[1] {
        OpenAiStreamChunk::ResponseComplete(response) => {
            assert_eq!(response.model, "gpt-4o");
            assert_eq!(response.message.content, "Hello");
            assert_eq!(response.message.tool_calls[0].id, "call_1");
            assert_eq!(response.message.tool_calls[0].arguments, "{}");
            assert_eq!(response.finish_reason, OpenAiFinishReason::ToolCalls);
        }
        other => panic!("unexpected chunk: {other:?}"),
    }
}

#[test]
fn accumulator_rejects_malformed_payload() {
    let mut accumulator = StreamAccumulator::new("fallback".to_string());
    let error = accumulator
        .push_payload("{not json")
        .expect_err("malformed payload should fail");
    assert_eq!(error.kind, ProviderErrorKind::Transport);
}
