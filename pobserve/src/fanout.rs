//! Forwards every hook event to two observers in order.

use std::time::Duration;

use pchat::{ChatError, ToolCallTrace, TurnHooks, TurnResult, TurnState};
use pcommon::ConversationId;
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use ptooling::{ToolError, ToolExecutionContext, ToolRuntimeHooks};

/// Pairs two observers; nest it to fan out further.
#[derive(Debug, Clone, Default)]
pub struct FanoutHooks<A, B> {
    first: A,
    second: B,
}

impl<A, B> FanoutHooks<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> ProviderOperationHooks for FanoutHooks<A, B>
where
    A: ProviderOperationHooks,
    B: ProviderOperationHooks,
{
    fn on_call_start(&self, provider: &ProviderId, operation: &str, model: &str) {
        self.first.on_call_start(provider, operation, model);
        self.second.on_call_start(provider, operation, model);
    }

    fn on_call_success(&self, provider: &ProviderId, operation: &str, model: &str, elapsed: Duration) {
        self.first
            .on_call_success(provider, operation, model, elapsed);
        self.second
            .on_call_success(provider, operation, model, elapsed);
    }

    fn on_call_failure(
        &self,
        provider: &ProviderId,
        operation: &str,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        self.first
            .on_call_failure(provider, operation, model, elapsed, error);
        self.second
            .on_call_failure(provider, operation, model, elapsed, error);
    }
}

impl<A, B> ToolRuntimeHooks for FanoutHooks<A, B>
where
    A: ToolRuntimeHooks,
    B: ToolRuntimeHooks,
{
    fn on_execution_start(&self, tool_name: &str, context: &ToolExecutionContext) {
        self.first.on_execution_start(tool_name, context);
        self.second.on_execution_start(tool_name, context);
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        self.first.on_execution_success(tool_name, context, elapsed);
        self.second.on_execution_success(tool_name, context, elapsed);
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        self.first
            .on_execution_failure(tool_name, context, error, elapsed);
        self.second
            .on_execution_failure(tool_name, context, error, elapsed);
    }
}

impl<A, B> TurnHooks for FanoutHooks<A, B>
where
    A: TurnHooks,
    B: TurnHooks,
{
    fn on_state_change(&self, conversation_id: &ConversationId, state: TurnState) {
        self.first.on_state_change(conversation_id, state);
        self.second.on_state_change(conversation_id, state);
    }

    fn on_tool_call(&self, conversation_id: &ConversationId, trace: &ToolCallTrace) {
        self.first.on_tool_call(conversation_id, trace);
        self.second.on_tool_call(conversation_id, trace);
    }

    fn on_turn_complete(
        &self,
        conversation_id: &ConversationId,
        result: &TurnResult,
        elapsed: Duration,
    ) {
        self.first.on_turn_complete(conversation_id, result, elapsed);
        self.second.on_turn_complete(conversation_id, result, elapsed);
    }

    fn on_turn_failure(&self, conversation_id: &ConversationId, error: &ChatError, elapsed: Duration) {
        self.first.on_turn_failure(conversation_id, error, elapsed);
        self.second.on_turn_failure(conversation_id, error, elapsed);
    }
}
