//! Unified facade over the parley workspace crates.
//!
//! This crate is the single dependency for most applications. It re-exports the
//! core crates, wires them into a [`Gateway`] from a [`GatewayConfig`], and
//! provides helpers and macros for building messages and requests.
//!
//! ```rust,no_run
//! use parley::{Gateway, GatewayRequest};
//!
//! # async fn run() -> Result<(), parley::GatewayError> {
//! parley::telemetry::init_tracing(parley::telemetry::DEFAULT_FILTER)?;
//! let gateway = Gateway::from_env().await?;
//!
//! let response = gateway.handle(GatewayRequest::new("What time is it?")).await?;
//! println!("{}: {}", response.conversation_id, response.response);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod macros;
mod types;

pub mod prelude;
pub mod runtime;
pub mod telemetry;
pub mod util;

pub use pchat;
pub use pcommon;
pub use pobserve;
pub use pprovider;
pub use psecrets;
pub use ptooling;

pub use config::{
    ConfigError, DEFAULT_PROVIDER, DEFAULT_PROVIDER_TIMEOUT, DEFAULT_TOOL_TIMEOUT, ENV_API_KEY,
    ENV_BASE_URL, ENV_MAX_TOKENS, ENV_MODEL, ENV_PLUGINS_DIR, ENV_PROVIDER,
    ENV_PROVIDER_TIMEOUT_SECS, ENV_SECRETS_PASSPHRASE, ENV_SECRETS_PATH, ENV_SYSTEM_PROMPT,
    ENV_TEMPERATURE, ENV_TOOL_TIMEOUT_SECS, GatewayConfig,
};
pub use error::{GatewayError, GatewayErrorKind};
pub use types::{GatewayRequest, GatewayResponse, GatewayToolCall};

pub use pchat::{
    ChatError, ChatErrorKind, ChatEvent, ChatEventStream, Conversation, ConversationOrchestrator,
    ConversationOrchestratorBuilder, ConversationStore, InMemoryConversationStore, NoopTurnHooks,
    OrchestratorStats, ToolCallTrace, TurnHooks, TurnResult, TurnState,
};
pub use pcommon::{BoxFuture, ConversationId, MetadataMap, TraceId};
pub use pobserve::{
    FanoutHooks, MetricsObservabilityHooks, SafeProviderHooks, SafeToolHooks, SafeTurnHooks,
    TracingObservabilityHooks,
};
pub use pprovider::{
    ChatChunk, ChatStream, Message, ModelConfig, ModelProvider, ModelRequest, ModelResponse,
    NoopOperationHooks, OutputItem, ProviderDescriptor, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, ProviderOperationHooks, ProviderRegistry, Role, SecretString,
    StopReason, TokenUsage, ToolCall, ToolDefinition, ToolSchema, builtin_descriptors,
};
pub use psecrets::{SecretError, SecretErrorKind, SecretMetadata, SecretStore, StoredSecret};
pub use ptooling::{
    BundleSource, FunctionTool, ManifestDirectorySource, NoopToolRuntimeHooks, StaticBundle,
    StaticBundleSource, Tool, ToolBundle, ToolError, ToolErrorKind, ToolExecutionContext,
    ToolRegistry, ToolResult, ToolRuntimeHooks,
};

pub use runtime::{Gateway, GatewayBuilder};
pub use util::{
    assistant_message, parse_provider_id, request, system_message, tool_message, user_message,
};
