//! Small convenience constructors for common types.

use pprovider::{Message, ProviderId, Role};

use crate::GatewayRequest;

pub fn system_message(content: impl Into<String>) -> Message {
    Message::new(Role::System, content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::new(Role::User, content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::new(Role::Assistant, content)
}

pub fn tool_message(tool_call_id: impl Into<String>, content: impl Into<String>) -> Message {
    Message::tool_result(tool_call_id, content)
}

pub fn request(message: impl Into<String>) -> GatewayRequest {
    GatewayRequest::new(message)
}

/// Maps common aliases onto the built-in adapter names.
pub fn parse_provider_id(value: &str) -> Option<ProviderId> {
    match value.trim().to_ascii_lowercase().as_str() {
        "openai" | "gpt" => Some(ProviderId::new("openai")),
        "anthropic" | "claude" => Some(ProviderId::new("anthropic")),
        "ollama" | "local" => Some(ProviderId::new("ollama")),
        _ => None,
    }
}
