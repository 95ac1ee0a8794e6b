//! Anthropic provider over its OpenAI-compatible endpoint.

use std::sync::Arc;

use crate::adapters::openai::{OpenAiProvider, http_transport, resolve_api_key_auth};
use crate::{ModelConfig, ModelProvider, ProviderDescriptor, ProviderError};

pub const ANTHROPIC: &str = "anthropic";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-sonnet-4-5",
    "claude-haiku-4-5",
    "claude-opus-4-1",
];

pub fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(ANTHROPIC, "Anthropic", build_client)
        .with_models(ANTHROPIC_MODELS.iter().copied())
        .with_streaming(true)
}

fn build_client(config: &ModelConfig) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let auth = resolve_api_key_auth(config, ANTHROPIC_API_KEY_ENV)?;
    let transport = http_transport(config, ANTHROPIC_BASE_URL)?;

    Ok(Arc::new(
        OpenAiProvider::new(Arc::new(transport), auth)
            .with_provider_id(ANTHROPIC)
            .with_fallback_model(config.model_or(ANTHROPIC_MODELS[0])),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn descriptor_advertises_streaming_and_default_model() {
        let descriptor = descriptor();
        assert_eq!(descriptor.name.as_str(), ANTHROPIC);
        assert!(descriptor.streaming);
        assert_eq!(descriptor.default_model(), Some(ANTHROPIC_MODELS[0]));
    }

    #[test]
    fn factory_builds_client_with_inline_key() {
        let config = ModelConfig::new(ANTHROPIC, "claude-haiku-4-5").with_api_key("sk-ant-test");
        let client = descriptor().build(&config).expect("client should build");
        assert_eq!(client.id().as_str(), ANTHROPIC);
        assert!(client.supports_streaming());
    }

    #[test]
    fn factory_without_any_key_fails_with_credential_error() {
        if std::env::var(ANTHROPIC_API_KEY_ENV).is_ok() {
            return;
        }

        let error = descriptor()
            .build(&ModelConfig::new(ANTHROPIC, "claude-haiku-4-5"))
            .err()
            .expect("missing key should fail");
        assert_eq!(error.kind, ProviderErrorKind::Credential);
    }
}
