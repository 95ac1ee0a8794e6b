//! Conversation, turn, and chat event types.

use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_core::Stream;
use pcommon::{ConversationId, MetadataMap};
use pprovider::{Message, Role, TokenUsage, ToolDefinition};
use serde_json::Value;

/// Transcript plus the tool catalog captured when the conversation was created.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub created_at: DateTime<Utc>,
    pub metadata: MetadataMap,
}

impl Conversation {
    pub fn new(id: impl Into<ConversationId>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: vec![Message::new(Role::System, system_prompt).stamped()],
            tools: Vec::new(),
            created_at: Utc::now(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// One tool invocation performed during a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallTrace {
    pub id: String,
    pub name: String,
    pub arguments: String,
    pub success: bool,
    /// Payload fed back to the model.
    pub output: Value,
    pub execution_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub conversation_id: ConversationId,
    pub reply: String,
    pub tool_calls: Vec<ToolCallTrace>,
    pub usage: TokenUsage,
}

/// Progress of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnState {
    Received,
    ProviderCallPending,
    ToolCallsRequested,
    ExecutingTools,
    FollowupPending,
    Complete,
}

impl TurnState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::ProviderCallPending => "provider_call_pending",
            Self::ToolCallsRequested => "tool_calls_requested",
            Self::ExecutingTools => "executing_tools",
            Self::FollowupPending => "followup_pending",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrchestratorStats {
    pub conversations: usize,
    pub total_messages: usize,
    pub available_tools: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    TextDelta(String),
    ToolCall(ToolCallTrace),
    TurnComplete(TurnResult),
}

pub type ChatEventStream<'a> =
    Pin<Box<dyn Stream<Item = Result<ChatEvent, crate::ChatError>> + Send + 'a>>;
