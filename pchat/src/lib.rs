//! Conversation orchestration for the parley gateway.
//!
//! [`ConversationOrchestrator`] owns conversations, drives the active provider of a
//! [`pprovider::ProviderRegistry`] and executes requested tools through a
//! [`ptooling::ToolRegistry`], following a bounded two-pass protocol per turn.

mod error;
mod hooks;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatEvent, ChatEventStream, Conversation,
        ConversationOrchestrator, ConversationOrchestratorBuilder, ConversationStore,
        InMemoryConversationStore, NoopTurnHooks, OrchestratorStats, ToolCallTrace, TurnHooks,
        TurnResult, TurnState,
    };
    pub use pcommon::{ConversationId, MetadataMap, TraceId};
    pub use ptooling::{
        Tool, ToolError, ToolErrorKind, ToolExecutionContext, ToolRegistry, ToolResult,
    };
}

pub use error::{ChatError, ChatErrorKind};
pub use hooks::{NoopTurnHooks, TurnHooks};
pub use service::{ConversationOrchestrator, ConversationOrchestratorBuilder, DEFAULT_SYSTEM_PROMPT};
pub use store::{ChatFuture, ConversationStore, InMemoryConversationStore};
pub use types::{
    ChatEvent, ChatEventStream, Conversation, OrchestratorStats, ToolCallTrace, TurnResult,
    TurnState,
};
pub use pcommon::{ConversationId, MetadataMap, TraceId};
