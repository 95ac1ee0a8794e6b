//! Facade-level error covering configuration, wiring and turn failures.

use std::error::Error;
use std::fmt::{Display, Formatter};

use pchat::{ChatError, ChatErrorKind};
use pprovider::{ProviderError, ProviderErrorKind};
use psecrets::{SecretError, SecretErrorKind};
use ptooling::ToolError;

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    Config,
    InvalidRequest,
    NotFound,
    Credential,
    Provider,
    Tooling,
    Secrets,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Credential, message)
    }

    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }

    /// Whether the caller sent something the gateway cannot act on.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind,
            GatewayErrorKind::InvalidRequest | GatewayErrorKind::NotFound
        )
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for GatewayError {}

impl From<ConfigError> for GatewayError {
    fn from(value: ConfigError) -> Self {
        Self::new(GatewayErrorKind::Config, value.to_string())
    }
}

impl From<ChatError> for GatewayError {
    fn from(value: ChatError) -> Self {
        let kind = match value.kind {
            ChatErrorKind::InvalidRequest => GatewayErrorKind::InvalidRequest,
            ChatErrorKind::NotFound => GatewayErrorKind::NotFound,
            ChatErrorKind::Credential => GatewayErrorKind::Credential,
            ChatErrorKind::Provider => GatewayErrorKind::Provider,
            ChatErrorKind::Tooling => GatewayErrorKind::Tooling,
            ChatErrorKind::Store => GatewayErrorKind::Internal,
        };
        Self::new(kind, value.message).with_status(value.status)
    }
}

impl From<ProviderError> for GatewayError {
    fn from(value: ProviderError) -> Self {
        let kind = match value.kind {
            ProviderErrorKind::NotFound => GatewayErrorKind::NotFound,
            ProviderErrorKind::Credential => GatewayErrorKind::Credential,
            ProviderErrorKind::InvalidRequest => GatewayErrorKind::InvalidRequest,
            _ => GatewayErrorKind::Provider,
        };
        Self::new(kind, value.to_string()).with_status(value.status)
    }
}

impl From<ToolError> for GatewayError {
    fn from(value: ToolError) -> Self {
        Self::new(GatewayErrorKind::Tooling, value.to_string())
    }
}

impl From<SecretError> for GatewayError {
    fn from(value: SecretError) -> Self {
        let kind = match value.kind {
            SecretErrorKind::NotFound => GatewayErrorKind::NotFound,
            SecretErrorKind::InvalidRequest => GatewayErrorKind::InvalidRequest,
            SecretErrorKind::Persistence | SecretErrorKind::Crypto => GatewayErrorKind::Secrets,
        };
        Self::new(kind, value.to_string())
    }
}
