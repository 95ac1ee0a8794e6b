//! Turn lifecycle hooks.
//!
//! ```rust
//! use pchat::{NoopTurnHooks, TurnHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn TurnHooks) {}
//!
//! assert_hooks_trait(&NoopTurnHooks);
//! ```

use std::time::Duration;

use pcommon::ConversationId;

use crate::{ChatError, ToolCallTrace, TurnResult, TurnState};

pub trait TurnHooks: Send + Sync {
    fn on_state_change(&self, _conversation_id: &ConversationId, _state: TurnState) {}

    fn on_tool_call(&self, _conversation_id: &ConversationId, _trace: &ToolCallTrace) {}

    fn on_turn_complete(
        &self,
        _conversation_id: &ConversationId,
        _result: &TurnResult,
        _elapsed: Duration,
    ) {
    }

    fn on_turn_failure(
        &self,
        _conversation_id: &ConversationId,
        _error: &ChatError,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnHooks;

impl TurnHooks for NoopTurnHooks {}
