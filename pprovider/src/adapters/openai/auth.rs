//! Credential resolution for OpenAI-compatible backends.

use crate::{ModelConfig, ProviderError};

use super::types::OpenAiAuth;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Resolves an API key from the config, then from `env_var`.
pub fn resolve_api_key_auth(
    config: &ModelConfig,
    env_var: &str,
) -> Result<OpenAiAuth, ProviderError> {
    config.resolve_api_key(env_var).map(OpenAiAuth::ApiKey)
}
