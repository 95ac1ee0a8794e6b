//! Transport-shaped request and response for one gateway turn.
//!
//! Field names serialize in camelCase so an HTTP or WebSocket layer can relay
//! them unchanged.

use pchat::{ToolCallTrace, TurnResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub message: String,
    /// Starts a new conversation when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Falls back to the configured default provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GatewayRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            provider: None,
            model: None,
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
    pub success: bool,
    pub output: Value,
    pub duration_ms: u64,
}

impl From<ToolCallTrace> for GatewayToolCall {
    fn from(trace: ToolCallTrace) -> Self {
        Self {
            id: trace.id,
            name: trace.name,
            arguments: trace.arguments,
            success: trace.success,
            output: trace.output,
            duration_ms: u64::try_from(trace.execution_time.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub conversation_id: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<GatewayToolCall>,
}

impl From<TurnResult> for GatewayResponse {
    fn from(result: TurnResult) -> Self {
        Self {
            conversation_id: result.conversation_id.to_string(),
            response: result.reply,
            tool_calls: result
                .tool_calls
                .into_iter()
                .map(GatewayToolCall::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pprovider::TokenUsage;
    use serde_json::json;

    use super::*;

    #[test]
    fn request_accepts_camel_case_wire_format() {
        let request: GatewayRequest = serde_json::from_value(json!({
            "message": "hello",
            "conversationId": "conv-1",
            "provider": "ollama",
        }))
        .expect("deserialize");

        assert_eq!(
            request,
            GatewayRequest::new("hello")
                .with_conversation_id("conv-1")
                .with_provider("ollama")
        );
        assert!(request.model.is_none());
    }

    #[test]
    fn response_omits_empty_tool_calls() {
        let response = GatewayResponse::from(TurnResult {
            conversation_id: "conv-1".into(),
            reply: "hi".to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
        });

        let wire = serde_json::to_value(&response).expect("serialize");
        assert_eq!(wire, json!({"conversationId": "conv-1", "response": "hi"}));
    }

    #[test]
    fn response_carries_tool_call_trace() {
        let response = GatewayResponse::from(TurnResult {
            conversation_id: "conv-1".into(),
            reply: "It is noon.".to_string(),
            tool_calls: vec![ToolCallTrace {
                id: "c1".to_string(),
                name: "get_time".to_string(),
                arguments: "{}".to_string(),
                success: true,
                output: json!({"success": true, "data": {"now": "12:00"}}),
                execution_time: Duration::from_millis(4),
            }],
            usage: TokenUsage::default(),
        });

        let wire = serde_json::to_value(&response).expect("serialize");
        assert_eq!(wire["toolCalls"][0]["name"], "get_time");
        assert_eq!(wire["toolCalls"][0]["durationMs"], 4);
    }
}
