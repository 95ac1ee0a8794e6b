//! Redacted secret values and per-provider model configuration.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use pprovider::{ModelConfig, SecretString};
//!
//! let config = ModelConfig::new("openai", "gpt-4o-mini")
//!     .with_api_key("sk-test")
//!     .with_max_tokens(512)
//!     .with_timeout(Duration::from_secs(30));
//!
//! assert_eq!(format!("{:?}", SecretString::new("sk-test")), "[REDACTED]");
//! assert_eq!(config.resolve_api_key("UNUSED_ENV").unwrap().expose(), "sk-test");
//! ```

use std::time::Duration;

use crate::{ProviderError, ProviderId};

#[derive(Clone, PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // SAFETY: zero bytes are valid UTF-8, so the string stays well-formed.
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Configuration a provider factory builds a client from.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub provider: ProviderId,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl ModelConfig {
    pub fn new(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            base_url: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.is_empty())
    }

    /// Returns the inline key, falling back to `env_var` from the process environment.
    pub fn resolve_api_key(&self, env_var: &str) -> Result<SecretString, ProviderError> {
        if let Some(key) = self.api_key.as_ref().filter(|key| !key.is_empty()) {
            return Ok(key.clone());
        }

        match std::env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => Ok(SecretString::new(value)),
            _ => Err(ProviderError::credential(format!(
                "no API key for provider '{}': set it in the model config or {env_var}",
                self.provider
            ))),
        }
    }

    /// Uses `fallback` when the configured model id is blank.
    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.model.trim().is_empty() {
            fallback
        } else {
            self.model.as_str()
        }
    }
}
