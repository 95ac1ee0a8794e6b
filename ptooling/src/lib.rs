//! Tool layer for the parley gateway: bundles, discovery, registration and dispatch.
//!
//! Tools are grouped into [`ToolBundle`]s. A [`ToolRegistry`] loads bundles from a
//! [`BundleSource`], keeps a flat name to tool index, and dispatches calls under an
//! optional deadline. Whatever an executor does, dispatch yields a [`ToolResult`].
//!
//! ```rust
//! use ptooling::builtins::builtin_source;
//! use ptooling::ToolRegistry;
//! use std::sync::Arc;
//!
//! let registry = ToolRegistry::new();
//! let report = futures_util::FutureExt::now_or_never(registry.load(Arc::new(builtin_source())))
//!     .expect("static discovery completes immediately")
//!     .expect("builtin bundles are valid");
//!
//! assert_eq!(report.loaded, vec!["clock".to_string(), "system".to_string()]);
//! assert!(registry.contains("get_time").unwrap());
//! ```

mod args;
mod bundle;
pub mod builtins;
mod error;
mod hooks;
mod registry;
mod source;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        BundleSource, FunctionTool, StaticBundle, Tool, ToolBundle, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolFuture, ToolOutcome, ToolRegistry, ToolResult,
    };
}

pub use args::{optional_string, parse_arguments, required_string};
pub use bundle::{StaticBundle, ToolBundle};
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use registry::{
    BundleStats, CollisionPolicy, LoadReport, RegisterOutcome, RegistryStats, ToolRegistry,
};
pub use source::{
    BundleFactory, BundleManifest, BundleSource, Discovery, ManifestDirectorySource,
    RejectedBundle, StaticBundleSource,
};
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::{ToolExecutionContext, ToolOutcome, ToolResult};
