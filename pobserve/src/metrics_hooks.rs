//! Metrics-based observability hooks for provider calls, tool executions and turns.
//!
//! ```rust
//! use pobserve::MetricsObservabilityHooks;
//! use pprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use pchat::{ChatError, ToolCallTrace, TurnHooks, TurnResult};
use pcommon::ConversationId;
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use ptooling::{ToolError, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_call_start(&self, provider: &ProviderId, operation: &str, _model: &str) {
        metrics::counter!(
            "parley_provider_call_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_call_success(&self, provider: &ProviderId, operation: &str, model: &str, elapsed: Duration) {
        metrics::counter!(
            "parley_provider_call_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "parley_provider_call_duration_seconds",
            "provider" => provider.to_string(),
            "model" => model.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_call_failure(
        &self,
        provider: &ProviderId,
        operation: &str,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "parley_provider_call_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "parley_provider_call_duration_seconds",
            "provider" => provider.to_string(),
            "model" => model.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_execution_start(&self, tool_name: &str, _context: &ToolExecutionContext) {
        metrics::counter!(
            "parley_tool_execution_start_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "parley_tool_execution_success_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "parley_tool_execution_duration_seconds",
            "tool_name" => tool_name.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "parley_tool_execution_failure_total",
            "tool_name" => tool_name.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "parley_tool_execution_duration_seconds",
            "tool_name" => tool_name.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl TurnHooks for MetricsObservabilityHooks {
    fn on_tool_call(&self, _conversation_id: &ConversationId, trace: &ToolCallTrace) {
        metrics::counter!(
            "parley_turn_tool_calls_total",
            "tool_name" => trace.name.clone(),
            "success" => trace.success.to_string()
        )
        .increment(1);
    }

    fn on_turn_complete(
        &self,
        _conversation_id: &ConversationId,
        result: &TurnResult,
        elapsed: Duration,
    ) {
        metrics::counter!("parley_turn_complete_total").increment(1);
        metrics::histogram!("parley_turn_duration_seconds", "status" => "success")
            .record(elapsed.as_secs_f64());
        metrics::histogram!("parley_turn_tokens").record(f64::from(result.usage.total_tokens));
    }

    fn on_turn_failure(&self, _conversation_id: &ConversationId, error: &ChatError, elapsed: Duration) {
        metrics::counter!(
            "parley_turn_failure_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("parley_turn_duration_seconds", "status" => "failure")
            .record(elapsed.as_secs_f64());
    }
}
