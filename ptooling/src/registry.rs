//! Tool registry: bundle lifecycle, name resolution and guarded dispatch.
//!
//! ```rust
//! use pprovider::{ToolDefinition, ToolSchema};
//! use ptooling::{StaticBundle, ToolExecutionContext, ToolRegistry};
//! use serde_json::json;
//!
//! # block_on(async {
//! let registry = ToolRegistry::new();
//! registry
//!     .register(StaticBundle::new("demo").with_sync_fn(
//!         ToolDefinition::new("double", "Doubles n", ToolSchema::new()),
//!         |params, _ctx| Ok(json!(params["n"].as_i64().unwrap_or(0) * 2)),
//!     ))
//!     .unwrap();
//!
//! let result = registry
//!     .dispatch("double", json!({"n": 21}), &ToolExecutionContext::new("c-1"))
//!     .await
//!     .unwrap();
//! assert_eq!(result.to_payload()["data"], 42);
//! # });
//! # fn block_on<F: std::future::Future>(future: F) -> F::Output {
//! #     futures_util::FutureExt::now_or_never(future).expect("future should be ready")
//! # }
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::FutureExt;
use futures_util::future::{Either, select};
use pcommon::Registry;
use pprovider::ToolDefinition;
use serde_json::Value;

use crate::{
    BundleSource, NoopToolRuntimeHooks, RejectedBundle, Tool, ToolBundle, ToolError,
    ToolExecutionContext, ToolResult, ToolRuntimeHooks,
};

/// What happens when a bundle registers a tool name another bundle already owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Last registration wins and takes ownership of the name.
    #[default]
    Replace,
    /// Registration fails and the registry is left unchanged.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered { tools: usize },
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub disabled: Vec<String>,
    pub rejected: Vec<RejectedBundle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleStats {
    pub name: String,
    pub enabled: bool,
    pub tools: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub bundles: usize,
    pub enabled_bundles: usize,
    pub tools: usize,
}

#[derive(Clone)]
struct RegisteredTool {
    bundle: String,
    tool: Arc<dyn Tool>,
    definition: ToolDefinition,
}

struct BundleEntry {
    bundle: Arc<dyn ToolBundle>,
    enabled: bool,
    tool_names: Vec<String>,
}

#[derive(Default)]
struct RegistryState {
    tools: Registry<String, RegisteredTool>,
    bundles: Registry<String, BundleEntry>,
}

pub struct ToolRegistry {
    state: RwLock<RegistryState>,
    source: RwLock<Option<Arc<dyn BundleSource>>>,
    collision_policy: CollisionPolicy,
    tool_timeout: Option<Duration>,
    hooks: Arc<dyn ToolRuntimeHooks>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            source: RwLock::new(None),
            collision_policy: CollisionPolicy::default(),
            tool_timeout: None,
            hooks: Arc::new(NoopToolRuntimeHooks),
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Per-call deadline for tool executors.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Discovers bundles from `source` and registers each valid one.
    ///
    /// Invalid bundles are skipped and reported. The source is kept for `reload`.
    pub async fn load(&self, source: Arc<dyn BundleSource>) -> Result<LoadReport, ToolError> {
        let discovery = source.discover().await?;
        *self.source_mut()? = Some(Arc::clone(&source));

        let mut report = LoadReport {
            rejected: discovery.rejected,
            ..LoadReport::default()
        };

        for rejected in &report.rejected {
            tracing::warn!(bundle = %rejected.name, reason = %rejected.reason, "bundle rejected during discovery");
        }

        for bundle in discovery.bundles {
            let name = bundle.name().to_string();
            match self.register_shared(bundle) {
                Ok(RegisterOutcome::Registered { .. }) => report.loaded.push(name),
                Ok(RegisterOutcome::Disabled) => report.disabled.push(name),
                Err(error) => {
                    tracing::warn!(bundle = %name, error = %error, "bundle skipped");
                    report.rejected.push(RejectedBundle::new(name, error.message));
                }
            }
        }

        tracing::debug!(
            loaded = report.loaded.len(),
            disabled = report.disabled.len(),
            rejected = report.rejected.len(),
            "tool bundles loaded"
        );
        Ok(report)
    }

    pub fn register<B>(&self, bundle: B) -> Result<RegisterOutcome, ToolError>
    where
        B: ToolBundle + 'static,
    {
        self.register_shared(Arc::new(bundle))
    }

    /// Validates and registers a bundle. Nothing changes when validation fails.
    pub fn register_shared(
        &self,
        bundle: Arc<dyn ToolBundle>,
    ) -> Result<RegisterOutcome, ToolError> {
        let name = bundle.name().to_string();
        if name.trim().is_empty() {
            return Err(ToolError::invalid_arguments("bundle name must not be empty"));
        }

        if !bundle.enabled() {
            let mut state = self.state_mut()?;
            ensure_unregistered(&state, &name)?;
            state.bundles.insert(
                name.clone(),
                BundleEntry {
                    bundle,
                    enabled: false,
                    tool_names: Vec::new(),
                },
            );
            tracing::debug!(bundle = %name, "bundle disabled; no tools registered");
            return Ok(RegisterOutcome::Disabled);
        }

        let tools = bundle
            .tools()
            .into_iter()
            .map(|tool| (tool.definition(), tool))
            .collect::<Vec<_>>();
        validate_tools(&name, &tools)?;

        let mut state = self.state_mut()?;
        ensure_unregistered(&state, &name)?;

        let collisions = tools
            .iter()
            .filter_map(|(definition, _)| {
                state
                    .tools
                    .get(definition.name.as_str())
                    .map(|existing| (definition.name.clone(), existing.bundle.clone()))
            })
            .collect::<Vec<_>>();

        if self.collision_policy == CollisionPolicy::Reject
            && let Some((tool, owner)) = collisions.first()
        {
            return Err(ToolError::invalid_arguments(format!(
                "tool '{tool}' is already provided by bundle '{owner}'"
            ))
            .with_tool_name(tool.clone())
            .with_bundle(name));
        }

        for (tool, owner) in &collisions {
            tracing::warn!(tool = %tool, previous_bundle = %owner, bundle = %name, "tool name collision; replacing");
            if let Some(entry) = state.bundles.get_mut(owner.as_str()) {
                entry.tool_names.retain(|owned| owned != tool);
            }
        }

        let count = tools.len();
        let mut tool_names = Vec::with_capacity(count);
        for (definition, tool) in tools {
            tool_names.push(definition.name.clone());
            state.tools.insert(
                definition.name.clone(),
                RegisteredTool {
                    bundle: name.clone(),
                    tool,
                    definition,
                },
            );
        }

        state.bundles.insert(
            name.clone(),
            BundleEntry {
                bundle,
                enabled: true,
                tool_names,
            },
        );

        tracing::debug!(bundle = %name, tools = count, "bundle registered");
        Ok(RegisterOutcome::Registered { tools: count })
    }

    /// Removes a bundle and the tools it still owns, then awaits its cleanup hook.
    pub async fn unregister(&self, name: &str) -> Result<(), ToolError> {
        let entry = {
            let mut state = self.state_mut()?;
            let entry = state.bundles.remove(name).ok_or_else(|| {
                ToolError::not_found(format!("bundle '{name}' is not registered")).with_bundle(name)
            })?;

            for tool in &entry.tool_names {
                let owned = state
                    .tools
                    .get(tool.as_str())
                    .is_some_and(|registered| registered.bundle == name);
                if owned {
                    state.tools.remove(tool.as_str());
                }
            }
            entry
        };

        entry.bundle.cleanup().await;
        tracing::debug!(bundle = %name, "bundle unregistered");
        Ok(())
    }

    /// Unregisters `name`, re-discovers from the loaded source and registers only
    /// the bundle with that name.
    pub async fn reload(&self, name: &str) -> Result<RegisterOutcome, ToolError> {
        let source = self.source_ref()?.clone().ok_or_else(|| {
            ToolError::invalid_arguments("no bundle source has been loaded").with_bundle(name)
        })?;

        if self.contains_bundle(name)? {
            self.unregister(name).await?;
        }

        let discovery = source.discover().await?;
        if let Some(rejected) = discovery.rejected.iter().find(|rejected| rejected.name == name) {
            return Err(ToolError::discovery(rejected.reason.clone()).with_bundle(name));
        }

        let bundle = discovery
            .bundles
            .into_iter()
            .find(|bundle| bundle.name() == name)
            .ok_or_else(|| {
                ToolError::not_found(format!("bundle '{name}' is no longer provided by the source"))
                    .with_bundle(name)
            })?;

        self.register_shared(bundle)
    }

    /// Executes a tool. Executor errors, panics and deadline expiry become failed
    /// results; only an unknown tool name is an error.
    pub async fn dispatch(
        &self,
        tool_name: &str,
        params: Value,
        context: &ToolExecutionContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self.get(tool_name)?.ok_or_else(|| {
            ToolError::not_found(format!("tool '{tool_name}' is not registered"))
                .with_tool_name(tool_name)
        })?;

        self.hooks.on_execution_start(tool_name, context);
        let started = Instant::now();
        let outcome = guarded_invoke(tool, params, context, self.tool_timeout).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(data) => {
                self.hooks.on_execution_success(tool_name, context, elapsed);
                Ok(ToolResult::success(data, elapsed))
            }
            Err(error) => {
                let error = error.with_tool_name(tool_name);
                self.hooks
                    .on_execution_failure(tool_name, context, &error, elapsed);
                Ok(ToolResult::failure(error.message, elapsed))
            }
        }
    }

    pub fn get(&self, tool_name: &str) -> Result<Option<Arc<dyn Tool>>, ToolError> {
        Ok(self
            .state_ref()?
            .tools
            .get(tool_name)
            .map(|registered| Arc::clone(&registered.tool)))
    }

    pub fn contains(&self, tool_name: &str) -> Result<bool, ToolError> {
        Ok(self.state_ref()?.tools.contains_key(tool_name))
    }

    pub fn contains_bundle(&self, name: &str) -> Result<bool, ToolError> {
        Ok(self.state_ref()?.bundles.contains_key(name))
    }

    /// Owning bundle of a registered tool.
    pub fn owner(&self, tool_name: &str) -> Result<Option<String>, ToolError> {
        Ok(self
            .state_ref()?
            .tools
            .get(tool_name)
            .map(|registered| registered.bundle.clone()))
    }

    /// Definitions of all registered tools, ordered by name.
    pub fn definitions(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let mut definitions = self
            .state_ref()?
            .tools
            .values()
            .map(|registered| registered.definition.clone())
            .collect::<Vec<_>>();
        definitions.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(definitions)
    }

    pub fn bundle_stats(&self) -> Result<Vec<BundleStats>, ToolError> {
        let mut stats = self
            .state_ref()?
            .bundles
            .iter()
            .map(|(name, entry)| BundleStats {
                name: name.clone(),
                enabled: entry.enabled,
                tools: entry.tool_names.len(),
            })
            .collect::<Vec<_>>();
        stats.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(stats)
    }

    pub fn stats(&self) -> Result<RegistryStats, ToolError> {
        let state = self.state_ref()?;
        Ok(RegistryStats {
            bundles: state.bundles.len(),
            enabled_bundles: state.bundles.values().filter(|entry| entry.enabled).count(),
            tools: state.tools.len(),
        })
    }

    fn state_ref(&self) -> Result<RwLockReadGuard<'_, RegistryState>, ToolError> {
        self.state
            .read()
            .map_err(|_| ToolError::other("tool registry lock poisoned"))
    }

    fn state_mut(&self) -> Result<RwLockWriteGuard<'_, RegistryState>, ToolError> {
        self.state
            .write()
            .map_err(|_| ToolError::other("tool registry lock poisoned"))
    }

    fn source_ref(
        &self,
    ) -> Result<RwLockReadGuard<'_, Option<Arc<dyn BundleSource>>>, ToolError> {
        self.source
            .read()
            .map_err(|_| ToolError::other("bundle source lock poisoned"))
    }

    fn source_mut(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Option<Arc<dyn BundleSource>>>, ToolError> {
        self.source
            .write()
            .map_err(|_| ToolError::other("bundle source lock poisoned"))
    }
}

fn ensure_unregistered(state: &RegistryState, name: &str) -> Result<(), ToolError> {
    if state.bundles.contains_key(name) {
        return Err(ToolError::invalid_arguments(format!(
            "bundle '{name}' is already registered; unregister or reload it"
        ))
        .with_bundle(name));
    }
    Ok(())
}

fn validate_tools(
    bundle: &str,
    tools: &[(ToolDefinition, Arc<dyn Tool>)],
) -> Result<(), ToolError> {
    if tools.is_empty() {
        return Err(
            ToolError::invalid_arguments("enabled bundle must provide at least one tool")
                .with_bundle(bundle),
        );
    }

    let mut seen = std::collections::HashSet::new();
    for (definition, _) in tools {
        if definition.name.trim().is_empty() {
            return Err(
                ToolError::invalid_arguments("tool name must not be empty").with_bundle(bundle),
            );
        }
        if !seen.insert(definition.name.as_str()) {
            return Err(ToolError::invalid_arguments(format!(
                "tool '{}' is declared twice",
                definition.name
            ))
            .with_bundle(bundle));
        }
    }

    Ok(())
}

async fn guarded_invoke(
    tool: Arc<dyn Tool>,
    params: Value,
    context: &ToolExecutionContext,
    timeout: Option<Duration>,
) -> Result<Value, ToolError> {
    let invocation = AssertUnwindSafe(async move { tool.invoke(params, context).await })
        .catch_unwind()
        .map(|outcome| match outcome {
            Ok(result) => result,
            Err(panic) => Err(ToolError::execution(format!(
                "tool panicked: {}",
                panic_message(panic.as_ref())
            ))),
        });

    let Some(limit) = timeout else {
        return invocation.await;
    };

    match select(Box::pin(invocation), Delay::new(limit)).await {
        Either::Left((result, _)) => result,
        Either::Right(_) => Err(ToolError::timeout(format!(
            "tool exceeded deadline of {}ms",
            limit.as_millis()
        ))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}
