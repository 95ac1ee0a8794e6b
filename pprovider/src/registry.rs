//! Provider catalog plus the single active client session.
//!
//! ```rust
//! use pprovider::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.descriptors().unwrap().is_empty());
//! assert!(registry.active_config().unwrap().is_none());
//! ```

use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use async_stream::try_stream;
use futures_util::StreamExt;
use pcommon::Registry;

use crate::{
    ChatChunk, ChatStream, Message, ModelConfig, ModelProvider, ModelRequest, ModelResponse,
    NoopOperationHooks, OutputItem, ProviderDescriptor, ProviderError, ProviderId,
    ProviderOperationHooks, Role, StopReason, StreamEvent, TokenUsage, ToolDefinition,
};

/// A bound client together with the configuration it was built from.
#[derive(Clone)]
pub struct ActiveProvider {
    pub client: Arc<dyn ModelProvider>,
    pub config: ModelConfig,
}

impl std::fmt::Debug for ActiveProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveProvider")
            .field("provider", &self.client.id())
            .field("config", &self.config)
            .finish()
    }
}

pub struct ProviderRegistry {
    descriptors: RwLock<Registry<ProviderId, ProviderDescriptor>>,
    active: RwLock<Option<ActiveProvider>>,
    call_timeout: Option<Duration>,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            descriptors: RwLock::new(Registry::new()),
            active: RwLock::new(None),
            call_timeout: None,
            hooks: Arc::new(NoopOperationHooks),
        }
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default deadline for provider calls; `ModelConfig::timeout` takes precedence.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Adds a descriptor, replacing any previous entry with the same name.
    pub fn register(&self, descriptor: ProviderDescriptor) -> Result<(), ProviderError> {
        self.descriptors_mut()?
            .insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<ProviderDescriptor>, ProviderError> {
        Ok(self.descriptors_ref()?.get(name).cloned())
    }

    pub fn contains(&self, name: &str) -> Result<bool, ProviderError> {
        Ok(self.descriptors_ref()?.contains_key(name))
    }

    /// Registered descriptors ordered by name.
    pub fn descriptors(&self) -> Result<Vec<ProviderDescriptor>, ProviderError> {
        let mut descriptors = self
            .descriptors_ref()?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        descriptors.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(descriptors)
    }

    /// Builds a client from `config` and makes it the active session.
    ///
    /// The previous session stays active when building fails.
    pub fn set_active(&self, config: ModelConfig) -> Result<(), ProviderError> {
        let descriptor = self.get(config.provider.as_str())?.ok_or_else(|| {
            ProviderError::not_found(format!("unknown provider '{}'", config.provider))
        })?;

        let config = descriptor.resolve_config(config);
        let client = descriptor.build(&config)?;
        *self.active_mut()? = Some(ActiveProvider { client, config });
        Ok(())
    }

    pub fn active(&self) -> Result<Option<ActiveProvider>, ProviderError> {
        Ok(self.active_ref()?.clone())
    }

    pub fn active_config(&self) -> Result<Option<ModelConfig>, ProviderError> {
        Ok(self
            .active_ref()?
            .as_ref()
            .map(|active| active.config.clone()))
    }

    pub fn has_active(&self) -> Result<bool, ProviderError> {
        Ok(self.active_ref()?.is_some())
    }

    pub fn clear_active(&self) -> Result<bool, ProviderError> {
        Ok(self.active_mut()?.take().is_some())
    }

    /// Sends the transcript and tool catalog to the active client.
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelResponse, ProviderError> {
        let active = self.require_active()?;
        let request = build_request(&active.config, messages, tools)?;
        let deadline = active.config.timeout.or(self.call_timeout);

        let provider = active.client.id();
        let model = request.model.clone();
        self.hooks.on_call_start(&provider, "chat", &model);
        let started = Instant::now();

        let result = with_deadline(deadline, active.client.complete(request)).await;
        match &result {
            Ok(_) => self
                .hooks
                .on_call_success(&provider, "chat", &model, started.elapsed()),
            Err(error) => {
                self.hooks
                    .on_call_failure(&provider, "chat", &model, started.elapsed(), error)
            }
        }

        result
    }

    /// Streams the reply of the active client.
    ///
    /// The backend is contacted on first poll, so call failures surface as the first
    /// stream item. The call deadline bounds opening the stream and each wait for
    /// the next event. Clients without native streaming yield one delta carrying the full
    /// reply, then `Done`.
    pub fn stream_chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ChatStream, ProviderError> {
        let active = self.require_active()?;
        let request = build_request(&active.config, messages, tools)?;
        let deadline = active.config.timeout.or(self.call_timeout);
        let hooks = Arc::clone(&self.hooks);
        let client = active.client;

        if !client.supports_streaming() {
            let stream = try_stream! {
                let response = observed_complete(client.as_ref(), hooks.as_ref(), request, deadline).await?;
                yield ChatChunk::Delta(response.text());
                yield ChatChunk::Done(response);
            };
            return Ok(ChatStream::new(stream));
        }

        let stream = try_stream! {
            let provider = client.id();
            let model = request.model.clone();
            hooks.on_call_start(&provider, "stream", &model);
            let started = Instant::now();

            let opened = with_deadline(deadline, client.stream(request)).await;
            if let Err(error) = &opened {
                hooks.on_call_failure(&provider, "stream", &model, started.elapsed(), error);
            }
            let mut events = opened?;

            let mut text = String::new();
            let mut completed = false;
            loop {
                let event = match with_deadline(deadline, async { Ok(events.next().await) }).await {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(error) => Err(error),
                };
                if let Err(error) = &event {
                    hooks.on_call_failure(&provider, "stream", &model, started.elapsed(), error);
                }

                match event? {
                    StreamEvent::TextDelta(delta) => {
                        text.push_str(&delta);
                        yield ChatChunk::Delta(delta);
                    }
                    StreamEvent::ResponseComplete(response) => {
                        completed = true;
                        yield ChatChunk::Done(response);
                        break;
                    }
                    StreamEvent::ToolCallDelta(_) | StreamEvent::MessageComplete(_) => {}
                }
            }

            hooks.on_call_success(&provider, "stream", &model, started.elapsed());
            if !completed {
                yield ChatChunk::Done(ModelResponse {
                    provider,
                    model,
                    output: vec![OutputItem::Message(Message::new(Role::Assistant, text))],
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage::default(),
                });
            }
        };

        Ok(ChatStream::new(stream))
    }

    fn require_active(&self) -> Result<ActiveProvider, ProviderError> {
        self.active()?.ok_or_else(ProviderError::no_active_provider)
    }

    fn descriptors_ref(
        &self,
    ) -> Result<RwLockReadGuard<'_, Registry<ProviderId, ProviderDescriptor>>, ProviderError> {
        self.descriptors
            .read()
            .map_err(|_| ProviderError::other("provider catalog lock poisoned"))
    }

    fn descriptors_mut(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Registry<ProviderId, ProviderDescriptor>>, ProviderError>
    {
        self.descriptors
            .write()
            .map_err(|_| ProviderError::other("provider catalog lock poisoned"))
    }

    fn active_ref(&self) -> Result<RwLockReadGuard<'_, Option<ActiveProvider>>, ProviderError> {
        self.active
            .read()
            .map_err(|_| ProviderError::other("active provider lock poisoned"))
    }

    fn active_mut(&self) -> Result<RwLockWriteGuard<'_, Option<ActiveProvider>>, ProviderError> {
        self.active
            .write()
            .map_err(|_| ProviderError::other("active provider lock poisoned"))
    }
}

fn build_request(
    config: &ModelConfig,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
) -> Result<ModelRequest, ProviderError> {
    let mut request = ModelRequest::new(config.model.clone(), messages).with_tools(tools);
    request.options.max_tokens = config.max_tokens;
    request.options.temperature = config.temperature;
    request.validate()?;
    Ok(request)
}

async fn observed_complete(
    client: &dyn ModelProvider,
    hooks: &dyn ProviderOperationHooks,
    request: ModelRequest,
    deadline: Option<Duration>,
) -> Result<ModelResponse, ProviderError> {
    let provider = client.id();
    let model = request.model.clone();
    hooks.on_call_start(&provider, "stream", &model);
    let started = Instant::now();

    let result = with_deadline(deadline, client.complete(request)).await;
    match &result {
        Ok(_) => hooks.on_call_success(&provider, "stream", &model, started.elapsed()),
        Err(error) => hooks.on_call_failure(&provider, "stream", &model, started.elapsed(), error),
    }
    result
}

async fn with_deadline<T, F>(deadline: Option<Duration>, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
            ProviderError::timeout(format!(
                "provider call exceeded deadline of {}ms",
                limit.as_millis()
            ))
        })?,
        None => call.await,
    }
}
