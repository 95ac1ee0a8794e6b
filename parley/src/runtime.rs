//! Gateway wiring: provider and tool registries, the secret store and the
//! conversation orchestrator behind a single request entry point.

use std::sync::Arc;

use pchat::{ConversationId, ConversationOrchestrator, TurnHooks};
use pobserve::{
    FanoutHooks, MetricsObservabilityHooks, SafeProviderHooks, SafeToolHooks, SafeTurnHooks,
    TracingObservabilityHooks,
};
use pprovider::{
    ModelConfig, ProviderDescriptor, ProviderId, ProviderRegistry, SecretString,
    builtin_descriptors,
};
use psecrets::SecretStore;
use ptooling::builtins::{builtin_factories, builtin_source};
use ptooling::{BundleSource, ManifestDirectorySource, ToolRegistry};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::{GatewayConfig, GatewayError, GatewayErrorKind, GatewayRequest, GatewayResponse};

type ObservabilityHooks = FanoutHooks<TracingObservabilityHooks, MetricsObservabilityHooks>;

fn observability() -> ObservabilityHooks {
    FanoutHooks::new(TracingObservabilityHooks, MetricsObservabilityHooks)
}

pub struct GatewayBuilder {
    config: GatewayConfig,
    descriptors: Vec<ProviderDescriptor>,
    bundle_source: Option<Arc<dyn BundleSource>>,
    secrets: Option<Arc<SecretStore>>,
    turn_hooks: Option<Arc<dyn TurnHooks>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            descriptors: builtin_descriptors(),
            bundle_source: None,
            secrets: None,
            turn_hooks: None,
        }
    }

    /// Adds a provider next to the compiled-in adapters.
    pub fn provider(mut self, descriptor: ProviderDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Replaces the built-in bundles and any configured plugin directory.
    pub fn bundle_source(mut self, source: Arc<dyn BundleSource>) -> Self {
        self.bundle_source = Some(source);
        self
    }

    /// Uses an already opened store instead of the configured secrets path.
    pub fn secret_store(mut self, secrets: Arc<SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn turn_hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.turn_hooks = Some(hooks);
        self
    }

    pub async fn build(self) -> Result<Gateway, GatewayError> {
        let Self {
            config,
            descriptors,
            bundle_source,
            secrets,
            turn_hooks,
        } = self;

        let providers = ProviderRegistry::new()
            .with_call_timeout(config.provider_timeout)
            .with_hooks(Arc::new(SafeProviderHooks::new(observability())));
        for descriptor in descriptors {
            providers.register(descriptor)?;
        }

        let tools = ToolRegistry::new()
            .with_tool_timeout(config.tool_timeout)
            .with_hooks(Arc::new(SafeToolHooks::new(observability())));
        let source: Arc<dyn BundleSource> = match (bundle_source, &config.plugins_dir) {
            (Some(source), _) => source,
            (None, Some(directory)) => Arc::new(
                ManifestDirectorySource::new(directory).with_factories(builtin_factories()),
            ),
            (None, None) => Arc::new(builtin_source()),
        };
        let report = tools.load(source).await?;
        for rejected in &report.rejected {
            tracing::warn!(bundle = %rejected.name, reason = %rejected.reason, "tool bundle rejected");
        }
        tracing::info!(
            loaded = report.loaded.len(),
            disabled = report.disabled.len(),
            rejected = report.rejected.len(),
            "tool bundles loaded"
        );

        let secrets = match (secrets, &config.secrets_path, &config.secrets_passphrase) {
            (Some(secrets), _, _) => Some(secrets),
            (None, Some(path), Some(passphrase)) => {
                Some(Arc::new(SecretStore::open(path, passphrase.expose()).await?))
            }
            _ => None,
        };

        let providers = Arc::new(providers);
        let tools = Arc::new(tools);
        let hooks =
            turn_hooks.unwrap_or_else(|| Arc::new(SafeTurnHooks::new(observability())));
        let mut orchestrator = ConversationOrchestrator::builder(Arc::clone(&providers))
            .tools(Arc::clone(&tools))
            .hooks(hooks);
        if let Some(system_prompt) = &config.system_prompt {
            orchestrator = orchestrator.system_prompt(system_prompt.clone());
        }

        Ok(Gateway {
            config,
            providers,
            tools,
            secrets,
            orchestrator: orchestrator.build(),
            activation: RwLock::new(()),
        })
    }
}

/// One gateway instance; share it behind an `Arc`.
///
/// Turns on the active provider run concurrently. Switching providers waits for
/// in-flight turns and holds new ones until the switch completes.
pub struct Gateway {
    config: GatewayConfig,
    providers: Arc<ProviderRegistry>,
    tools: Arc<ToolRegistry>,
    secrets: Option<Arc<SecretStore>>,
    orchestrator: ConversationOrchestrator,
    activation: RwLock<()>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("secrets", &self.secrets.is_some())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    pub async fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        GatewayBuilder::new(config).build().await
    }

    pub async fn from_env() -> Result<Self, GatewayError> {
        Self::from_config(GatewayConfig::from_env()?).await
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn secrets(&self) -> Option<&Arc<SecretStore>> {
        self.secrets.as_ref()
    }

    pub fn orchestrator(&self) -> &ConversationOrchestrator {
        &self.orchestrator
    }

    /// Runs one user turn.
    ///
    /// Starts a conversation when the request names none; an unknown id is `NotFound`.
    pub async fn handle(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        if request.message.trim().is_empty() {
            return Err(GatewayError::invalid_request("message must not be empty"));
        }

        let _turn = self
            .ensure_active(request.provider.as_deref(), request.model.as_deref())
            .await?;

        let conversation_id = match request.conversation_id {
            Some(id) => ConversationId::from(id),
            None => self.orchestrator.create().await?,
        };
        let result = self
            .orchestrator
            .send(&conversation_id, &request.message)
            .await?;

        Ok(GatewayResponse::from(result))
    }

    /// Makes `provider`/`model` the active session unless it already is.
    ///
    /// `None` selects the configured default provider and, for it, the configured model.
    pub async fn activate(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<ModelConfig, GatewayError> {
        let _guard = self.ensure_active(provider, model).await?;
        self.providers
            .active_config()?
            .ok_or_else(|| {
                GatewayError::new(
                    GatewayErrorKind::Internal,
                    "provider activation did not take effect",
                )
            })
    }

    async fn ensure_active(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<RwLockReadGuard<'_, ()>, GatewayError> {
        let provider = provider
            .map(|name| ProviderId::new(name.trim().to_ascii_lowercase()))
            .unwrap_or_else(|| self.config.provider.clone());

        let read = self.activation.read().await;
        if self.is_active(&provider, model)? {
            return Ok(read);
        }
        drop(read);

        let write = self.activation.write().await;
        if !self.is_active(&provider, model)? {
            let mut model_config = self.config.model_config(&provider, model);
            if !model_config.has_api_key()
                && let Some(api_key) = self.stored_credential(&provider).await?
            {
                model_config = model_config.with_api_key(api_key);
            }

            self.providers.set_active(model_config).inspect_err(|error| {
                tracing::warn!(provider = %provider, error = %error, "provider activation failed");
            })?;
            tracing::info!(provider = %provider, model = ?model, "provider activated");
        }

        Ok(write.downgrade())
    }

    fn is_active(&self, provider: &ProviderId, model: Option<&str>) -> Result<bool, GatewayError> {
        Ok(self.providers.active_config()?.is_some_and(|active| {
            active.provider == *provider && model.is_none_or(|model| model == active.model)
        }))
    }

    /// Most recently used stored key for `provider`, if a secret store is configured.
    async fn stored_credential(
        &self,
        provider: &ProviderId,
    ) -> Result<Option<SecretString>, GatewayError> {
        let Some(secrets) = &self.secrets else {
            return Ok(None);
        };
        let Some(metadata) = secrets.find_by_provider(provider.as_str()).await else {
            return Ok(None);
        };

        let api_key = secrets.get(metadata.id).await?;
        tracing::debug!(provider = %provider, secret = %metadata.name, "using stored credential");
        Ok(Some(api_key))
    }
}
