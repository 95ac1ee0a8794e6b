//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use pprovider::{ProviderError, ProviderErrorKind};
use ptooling::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    NotFound,
    Credential,
    Provider,
    Tooling,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    /// Upstream HTTP status, when the failure came from a backend response.
    pub status: Option<u16>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::NotFound, message)
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Credential, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let mapped = match value.kind {
            ProviderErrorKind::Credential => ChatError::credential(value.to_string()),
            ProviderErrorKind::InvalidRequest => ChatError::invalid_request(value.to_string()),
            _ => ChatError::provider(value.to_string()),
        };

        match value.status {
            Some(status) => mapped.with_status(status),
            None => mapped,
        }
    }
}

impl From<ToolError> for ChatError {
    fn from(value: ToolError) -> Self {
        ChatError::tooling(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_keep_class_and_status() {
        let upstream = ChatError::from(ProviderError::upstream(502, "bad gateway"));
        assert_eq!(upstream.kind, ChatErrorKind::Provider);
        assert_eq!(upstream.status, Some(502));

        let credential = ChatError::from(ProviderError::credential("set OPENAI_API_KEY"));
        assert_eq!(credential.kind, ChatErrorKind::Credential);
        assert!(credential.message.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn tool_errors_map_to_tooling() {
        let error = ChatError::from(ToolError::other("tool registry lock poisoned"));
        assert_eq!(error.kind, ChatErrorKind::Tooling);
        assert_eq!(
            error.to_string(),
            "Tooling: Other: tool registry lock poisoned"
        );
    }
}
