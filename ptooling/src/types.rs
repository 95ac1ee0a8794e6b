//! Tool execution context and result types.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use ptooling::ToolResult;
//! use serde_json::json;
//!
//! let ok = ToolResult::success(json!({"now": "2024-01-01T00:00:00Z"}), Duration::from_millis(3));
//! assert_eq!(ok.to_payload()["success"], true);
//!
//! let failed = ToolResult::failure("disk full", Duration::from_millis(1));
//! assert_eq!(failed.to_payload(), json!({"success": false, "error": "disk full"}));
//! ```

use std::time::Duration;

use pcommon::{ConversationId, MetadataMap, TraceId};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionContext {
    pub conversation_id: ConversationId,
    pub tool_call_id: Option<String>,
    pub trace_id: Option<TraceId>,
    pub metadata: MetadataMap,
}

impl ToolExecutionContext {
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            tool_call_id: None,
            trace_id: None,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success { data: Value },
    Failure { error: String },
}

/// Result of one dispatch. Always well-formed, whatever the executor did.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub outcome: ToolOutcome,
    pub execution_time: Duration,
}

impl ToolResult {
    pub fn success(data: Value, execution_time: Duration) -> Self {
        Self {
            outcome: ToolOutcome::Success { data },
            execution_time,
        }
    }

    pub fn failure(error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            outcome: ToolOutcome::Failure {
                error: error.into(),
            },
            execution_time,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Failure { error } => Some(error.as_str()),
            ToolOutcome::Success { .. } => None,
        }
    }

    /// Wire form fed back to the model.
    pub fn to_payload(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success { data } => json!({"success": true, "data": data}),
            ToolOutcome::Failure { error } => json!({"success": false, "error": error}),
        }
    }

    pub fn payload_string(&self) -> String {
        self.to_payload().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shapes_follow_outcome() {
        let ok = ToolResult::success(json!({"value": 3}), Duration::ZERO);
        assert!(ok.is_success());
        assert_eq!(ok.to_payload(), json!({"success": true, "data": {"value": 3}}));

        let failed = ToolResult::failure("nope", Duration::ZERO);
        assert_eq!(failed.error(), Some("nope"));
        let reparsed: Value =
            serde_json::from_str(&failed.payload_string()).expect("payload should be JSON");
        assert_eq!(reparsed, json!({"success": false, "error": "nope"}));
    }

    #[test]
    fn context_builder_sets_fields() {
        let context = ToolExecutionContext::new("conversation-1")
            .with_tool_call_id("c1")
            .with_trace_id("trace-1")
            .with_metadata("channel", "cli");

        assert_eq!(context.conversation_id.as_str(), "conversation-1");
        assert_eq!(context.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(context.metadata.get("channel"), Some(&"cli".to_string()));
    }
}
