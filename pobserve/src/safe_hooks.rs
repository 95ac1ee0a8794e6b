//! Panic-isolating wrappers so a faulty observer never takes down a call or turn.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use pchat::{ChatError, ToolCallTrace, TurnHooks, TurnResult, TurnState};
use pcommon::ConversationId;
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use ptooling::{ToolError, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone)]
pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_call_start(&self, provider: &ProviderId, operation: &str, model: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_call_start(provider, operation, model)
        }));
    }

    fn on_call_success(&self, provider: &ProviderId, operation: &str, model: &str, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_call_success(provider, operation, model, elapsed)
        }));
    }

    fn on_call_failure(
        &self,
        provider: &ProviderId,
        operation: &str,
        model: &str,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_call_failure(provider, operation, model, elapsed, error)
        }));
    }
}

#[derive(Debug, Clone)]
pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_execution_start(&self, tool_name: &str, context: &ToolExecutionContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_start(tool_name, context)
        }));
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_success(tool_name, context, elapsed)
        }));
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_failure(tool_name, context, error, elapsed)
        }));
    }
}

#[derive(Debug, Clone)]
pub struct SafeTurnHooks<H> {
    inner: H,
}

impl<H> SafeTurnHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H> TurnHooks for SafeTurnHooks<H>
where
    H: TurnHooks,
{
    fn on_state_change(&self, conversation_id: &ConversationId, state: TurnState) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_state_change(conversation_id, state)
        }));
    }

    fn on_tool_call(&self, conversation_id: &ConversationId, trace: &ToolCallTrace) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_tool_call(conversation_id, trace)
        }));
    }

    fn on_turn_complete(
        &self,
        conversation_id: &ConversationId,
        result: &TurnResult,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_complete(conversation_id, result, elapsed)
        }));
    }

    fn on_turn_failure(&self, conversation_id: &ConversationId, error: &ChatError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failure(conversation_id, error, elapsed)
        }));
    }
}
