//! Tool bundles: named groups of tools registered and removed together.
//!
//! ```rust
//! use pprovider::{ToolDefinition, ToolSchema};
//! use ptooling::{StaticBundle, ToolBundle};
//! use serde_json::json;
//!
//! let bundle = StaticBundle::new("math")
//!     .with_description("Arithmetic helpers")
//!     .with_sync_fn(
//!         ToolDefinition::new("zero", "Returns zero", ToolSchema::new()),
//!         |_params, _ctx| Ok(json!(0)),
//!     );
//!
//! assert_eq!(bundle.name(), "math");
//! assert!(bundle.enabled());
//! assert_eq!(bundle.tools().len(), 1);
//! ```

use std::future::Future;
use std::sync::Arc;

use pprovider::ToolDefinition;
use serde_json::Value;

use crate::{FunctionTool, Tool, ToolError, ToolExecutionContext, ToolFuture};

pub trait ToolBundle: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Disabled bundles are recorded by the registry but expose no tools.
    fn enabled(&self) -> bool {
        true
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>>;

    /// Awaited after the bundle's tools have been removed from a registry.
    fn cleanup<'a>(&'a self) -> ToolFuture<'a, ()> {
        Box::pin(async {})
    }
}

type CleanupHandler = dyn Fn() -> ToolFuture<'static, ()> + Send + Sync;

/// Bundle assembled in code from explicit tools.
#[derive(Clone)]
pub struct StaticBundle {
    name: String,
    description: String,
    enabled: bool,
    tools: Vec<Arc<dyn Tool>>,
    cleanup: Option<Arc<CleanupHandler>>,
}

impl StaticBundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            enabled: true,
            tools: Vec::new(),
            cleanup: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_tool<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_fn<F, Fut>(self, definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.with_tool(FunctionTool::new(definition, handler))
    }

    pub fn with_sync_fn<F>(self, definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value, ToolExecutionContext) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.with_tool(FunctionTool::from_sync(definition, handler))
    }

    pub fn on_cleanup<F, Fut>(mut self, cleanup: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cleanup = Some(Arc::new(move || Box::pin(cleanup())));
        self
    }
}

impl std::fmt::Debug for StaticBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticBundle")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl ToolBundle for StaticBundle {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn description(&self) -> &str {
        self.description.as_str()
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }

    fn cleanup<'a>(&'a self) -> ToolFuture<'a, ()> {
        match &self.cleanup {
            Some(cleanup) => cleanup(),
            None => Box::pin(async {}),
        }
    }
}
