//! Tracing-based observability hooks for provider calls, tool executions and turns.
//!
//! ```rust
//! use pchat::TurnHooks;
//! use pobserve::TracingObservabilityHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_turn_hooks(&hooks);
//! ```

use std::time::Duration;

use pchat::{ChatError, ToolCallTrace, TurnHooks, TurnResult, TurnState};
use pcommon::ConversationId;
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use ptooling::{ToolError, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_call_start(&self, provider: &ProviderId, operation: &str, model: &str) {
        tracing::info!(
            phase = "provider",
            event = "call_start",
            provider = %provider,
            operation,
            model
        );
    }

    fn on_call_success(&self, provider: &ProviderId, operation: &str, model: &str, elapsed: Duration) {
        tracing::info!(
            phase = "provider",
            event = "call_success",
            provider = %provider,
            operation,
            model,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_call_failure(
        &self,
        provider: &ProviderId,
        operation: &str,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "call_failure",
            provider = %provider,
            operation,
            model,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            status = error.status,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_execution_start(&self, tool_name: &str, context: &ToolExecutionContext) {
        tracing::info!(
            phase = "tool",
            event = "execution_start",
            tool_name,
            tool_call_id = context.tool_call_id.as_deref(),
            conversation_id = %context.conversation_id,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str())
        );
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "tool",
            event = "execution_success",
            tool_name,
            tool_call_id = context.tool_call_id.as_deref(),
            conversation_id = %context.conversation_id,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str()),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        tracing::warn!(
            phase = "tool",
            event = "execution_failure",
            tool_name,
            tool_call_id = context.tool_call_id.as_deref(),
            conversation_id = %context.conversation_id,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str()),
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }
}

impl TurnHooks for TracingObservabilityHooks {
    fn on_state_change(&self, conversation_id: &ConversationId, state: TurnState) {
        tracing::debug!(
            phase = "turn",
            event = "state_change",
            conversation_id = %conversation_id,
            state = state.as_str()
        );
    }

    fn on_tool_call(&self, conversation_id: &ConversationId, trace: &ToolCallTrace) {
        tracing::info!(
            phase = "turn",
            event = "tool_call",
            conversation_id = %conversation_id,
            tool_name = %trace.name,
            tool_call_id = %trace.id,
            success = trace.success
        );
    }

    fn on_turn_complete(
        &self,
        conversation_id: &ConversationId,
        result: &TurnResult,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "turn",
            event = "complete",
            conversation_id = %conversation_id,
            tool_calls = result.tool_calls.len(),
            total_tokens = result.usage.total_tokens,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_turn_failure(&self, conversation_id: &ConversationId, error: &ChatError, elapsed: Duration) {
        tracing::error!(
            phase = "turn",
            event = "failure",
            conversation_id = %conversation_id,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }
}
