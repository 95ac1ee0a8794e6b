//! Common imports for most parley applications.

pub use crate::{
    assistant_message, parse_provider_id, request, system_message, tool_message, user_message,
};
pub use crate::{parley_messages, parley_msg, parley_request};
pub use crate::{
    ChatError, ChatErrorKind, ChatEvent, ConversationId, ConversationOrchestrator, Gateway,
    GatewayBuilder, GatewayConfig, GatewayError, GatewayErrorKind, GatewayRequest,
    GatewayResponse, GatewayToolCall, Message, ModelConfig, ModelProvider, ProviderDescriptor,
    ProviderError, ProviderId, ProviderRegistry, Role, SecretStore, Tool, ToolBundle, ToolError,
    ToolExecutionContext, ToolRegistry, ToolResult, TurnResult,
};
