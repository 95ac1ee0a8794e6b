use std::sync::Arc;

use pcommon::BoxFuture;

use crate::{BoxedEventStream, ModelConfig, ModelRequest, ModelResponse, ProviderError, ProviderId};

pub type ProviderFuture<'a, T> = BoxFuture<'a, T>;

/// A bound client for one backend API.
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>>;

    fn supports_streaming(&self) -> bool {
        false
    }

    /// Native token stream. Only called when `supports_streaming` returns true.
    fn stream<'a>(
        &'a self,
        _request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        let provider = self.id();
        Box::pin(async move {
            Err(ProviderError::invalid_request(format!(
                "provider '{provider}' does not support streaming"
            )))
        })
    }
}

pub type ProviderFactory =
    Arc<dyn Fn(&ModelConfig) -> Result<Arc<dyn ModelProvider>, ProviderError> + Send + Sync>;

/// Catalog entry describing how to build a client for one provider.
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: ProviderId,
    pub display_name: String,
    pub models: Vec<String>,
    pub streaming: bool,
    factory: ProviderFactory,
}

impl ProviderDescriptor {
    pub fn new<F>(name: impl Into<ProviderId>, display_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ModelConfig) -> Result<Arc<dyn ModelProvider>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            models: Vec::new(),
            streaming: false,
            factory: Arc::new(factory),
        }
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    /// Fills a blank model id with the first catalog model.
    pub fn resolve_config(&self, mut config: ModelConfig) -> ModelConfig {
        if config.model.trim().is_empty()
            && let Some(model) = self.default_model()
        {
            config.model = model.to_string();
        }
        config
    }

    pub fn build(&self, config: &ModelConfig) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        (self.factory)(config)
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("models", &self.models)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}
