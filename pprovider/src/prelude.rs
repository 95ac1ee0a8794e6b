//! Common `pprovider` imports for downstream crates.

pub use crate::{
    ActiveProvider, BoxedEventStream, ChatChunk, ChatStream, Message, ModelConfig,
    ModelEventStream, ModelProvider, ModelRequest, ModelRequestBuilder, ModelResponse,
    NoopOperationHooks, OutputItem, ProviderDescriptor, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, ProviderOperationHooks, ProviderRegistry, Role, SecretString,
    StopReason, StreamEvent, TokenUsage, ToolCall, ToolDefinition, ToolSchema,
};
pub use pcommon::{BoxFuture, MetadataMap};
