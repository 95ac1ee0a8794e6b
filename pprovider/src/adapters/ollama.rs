//! Ollama provider over its OpenAI-compatible endpoint, plus local model listing.

use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;

use crate::adapters::openai::{OpenAiAuth, OpenAiProvider, http_transport, map_reqwest_error};
use crate::{ModelConfig, ModelProvider, ProviderDescriptor, ProviderError};

pub const OLLAMA: &str = "ollama";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_HOST_URL: &str = "http://localhost:11434";
pub const OLLAMA_MODELS: &[&str] = &["llama3.2", "qwen2.5", "mistral"];

/// Catalog entry for a local Ollama daemon. No credential is required.
pub fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::new(OLLAMA, "Ollama", build_client)
        .with_models(OLLAMA_MODELS.iter().copied())
        .with_streaming(true)
}

fn build_client(config: &ModelConfig) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let auth = match config.api_key.as_ref().filter(|key| !key.is_empty()) {
        Some(key) => OpenAiAuth::ApiKey(key.clone()),
        None => OpenAiAuth::None,
    };
    let transport = http_transport(config, OLLAMA_BASE_URL)?;

    Ok(Arc::new(
        OpenAiProvider::new(Arc::new(transport), auth)
            .with_provider_id(OLLAMA)
            .with_fallback_model(config.model_or(OLLAMA_MODELS[0])),
    ))
}

pub async fn list_ollama_models() -> Result<Vec<String>, ProviderError> {
    list_ollama_models_with_base_url(OLLAMA_HOST_URL).await
}

pub async fn list_ollama_models_with_base_url(
    base_url: impl Into<String>,
) -> Result<Vec<String>, ProviderError> {
    let base_url = base_url.into();
    let endpoint = format!("{}/api/tags", base_url.trim_end_matches('/'));

    let response = Client::new()
        .get(endpoint)
        .send()
        .await
        .map_err(map_reqwest_error)?;

    if !response.status().is_success() {
        let code = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::upstream(code, truncate(&body, 4096)));
    }

    let parsed = response
        .json::<OllamaTagsResponse>()
        .await
        .map_err(|err| ProviderError::transport(err.to_string()))?;

    let mut ids = parsed
        .models
        .into_iter()
        .map(|model| model.name)
        .collect::<Vec<_>>();
    ids.sort();
    Ok(ids)
}

fn truncate(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }

    let mut end = max;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &input[..end])
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}
