//! Production-friendly observability hooks for provider calls, tool executions and turns.
//!
//! ```rust
//! use pobserve::{
//!     FanoutHooks, MetricsObservabilityHooks, SafeProviderHooks, TracingObservabilityHooks,
//! };
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _both = FanoutHooks::new(TracingObservabilityHooks, MetricsObservabilityHooks);
//! ```

mod fanout;
mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use fanout::FanoutHooks;
pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeProviderHooks, SafeToolHooks, SafeTurnHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        FanoutHooks, MetricsObservabilityHooks, SafeProviderHooks, SafeToolHooks, SafeTurnHooks,
        TracingObservabilityHooks,
    };
}
