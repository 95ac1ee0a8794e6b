//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use pprovider::ProviderError;
//!
//! let missing = ProviderError::credential("no API key configured");
//! assert!(!missing.is_upstream());
//!
//! let upstream = ProviderError::upstream(502, "bad gateway");
//! assert!(upstream.is_upstream());
//! assert_eq!(upstream.status, Some(502));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Credential,
    NotFound,
    NoActiveProvider,
    InvalidRequest,
    Authentication,
    RateLimited,
    Timeout,
    Transport,
    Unavailable,
    Upstream,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
        }
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Credential, message, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message, false)
    }

    pub fn no_active_provider() -> Self {
        Self::new(
            ProviderErrorKind::NoActiveProvider,
            "no active provider; call set_active first",
            false,
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Upstream, message, status >= 500).with_status(status)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true for failures reported by, or on the way to, the backend API.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::Authentication
                | ProviderErrorKind::RateLimited
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Transport
                | ProviderErrorKind::Unavailable
                | ProviderErrorKind::Upstream
        )
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} (status {}): {}", self.kind, status, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}
