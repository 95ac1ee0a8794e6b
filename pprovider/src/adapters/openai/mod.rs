mod auth;
mod provider;
mod serde_api;
mod tests;
mod transport;
mod types;

use std::sync::Arc;

use crate::{ModelConfig, ModelProvider, ProviderDescriptor, ProviderError};

pub use auth::{OPENAI_API_KEY_ENV, resolve_api_key_auth};
pub use provider::{OPENAI, OpenAiProvider};
pub use transport::{OPENAI_BASE_URL, OpenAiChunkStream, OpenAiHttpTransport, OpenAiTransport};
pub(crate) use transport::map_reqwest_error;
pub use types::{
    OpenAiAssistantMessage, OpenAiAuth, OpenAiFinishReason, OpenAiMessage, OpenAiRequest,
    OpenAiResponse, OpenAiRole, OpenAiStreamChunk, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};

pub const OPENAI_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4.1", "gpt-4.1-mini"];

/// Catalog entry for the hosted OpenAI API.
pub fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(OPENAI, "OpenAI", build_client)
        .with_models(OPENAI_MODELS.iter().copied())
        .with_streaming(true)
}

fn build_client(config: &ModelConfig) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let auth = resolve_api_key_auth(config, OPENAI_API_KEY_ENV)?;
    let transport = http_transport(config, OPENAI_BASE_URL)?;

    Ok(Arc::new(
        OpenAiProvider::new(Arc::new(transport), auth)
            .with_fallback_model(config.model_or(OPENAI_MODELS[0])),
    ))
}

/// HTTP transport honoring the config's base URL override and timeout.
pub(crate) fn http_transport(
    config: &ModelConfig,
    default_base_url: &str,
) -> Result<OpenAiHttpTransport, ProviderError> {
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| default_base_url.to_string());
    Ok(OpenAiHttpTransport::with_timeout(config.timeout)?.with_base_url(base_url))
}
