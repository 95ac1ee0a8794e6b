//! Secret store errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretErrorKind {
    NotFound,
    InvalidRequest,
    Persistence,
    Crypto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretError {
    pub kind: SecretErrorKind,
    pub message: String,
}

impl SecretError {
    pub fn new(kind: SecretErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SecretErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SecretErrorKind::InvalidRequest, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(SecretErrorKind::Persistence, message)
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::new(SecretErrorKind::Crypto, message)
    }
}

impl Display for SecretError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for SecretError {}

impl From<std::io::Error> for SecretError {
    fn from(error: std::io::Error) -> Self {
        Self::persistence(error.to_string())
    }
}

impl From<serde_json::Error> for SecretError {
    fn from(error: serde_json::Error) -> Self {
        Self::persistence(error.to_string())
    }
}
