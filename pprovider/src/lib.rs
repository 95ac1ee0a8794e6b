//! Provider abstraction for the parley gateway.
//!
//! A [`ProviderRegistry`] holds a catalog of [`ProviderDescriptor`]s and at most one
//! active client session. Requests are expressed with provider-agnostic [`Message`]
//! and [`ToolDefinition`] values; adapters translate them to backend wire formats.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pprovider::{
//!     Message, ModelConfig, ModelProvider, ModelRequest, ModelResponse, OutputItem,
//!     ProviderDescriptor, ProviderError, ProviderFuture, ProviderId, ProviderRegistry, Role,
//!     StopReason, TokenUsage,
//! };
//!
//! struct Canned;
//!
//! impl ModelProvider for Canned {
//!     fn id(&self) -> ProviderId {
//!         ProviderId::new("canned")
//!     }
//!
//!     fn complete<'a>(
//!         &'a self,
//!         request: ModelRequest,
//!     ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
//!         Box::pin(async move {
//!             Ok(ModelResponse {
//!                 provider: self.id(),
//!                 model: request.model,
//!                 output: vec![OutputItem::Message(Message::new(Role::Assistant, "hi"))],
//!                 stop_reason: StopReason::EndTurn,
//!                 usage: TokenUsage::default(),
//!             })
//!         })
//!     }
//! }
//!
//! let registry = ProviderRegistry::new();
//! registry
//!     .register(ProviderDescriptor::new("canned", "Canned", |_config| {
//!         Ok(Arc::new(Canned) as Arc<dyn ModelProvider>)
//!     }))
//!     .unwrap();
//! registry.set_active(ModelConfig::new("canned", "canned-1")).unwrap();
//! assert!(registry.has_active().unwrap());
//! ```

pub mod adapters;
mod credentials;
mod error;
mod hooks;
mod model;
pub mod prelude;
mod provider;
mod registry;
mod stream;

pub use adapters::builtin_descriptors;
pub use credentials::{ModelConfig, SecretString};
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{NoopOperationHooks, ProviderOperationHooks};
pub use model::{
    Message, ModelRequest, ModelRequestBuilder, ModelResponse, OutputItem, ProviderId, Role,
    StopReason, TokenUsage, ToolCall, ToolDefinition, ToolSchema,
};
pub use provider::{ModelProvider, ProviderDescriptor, ProviderFactory, ProviderFuture};
pub use registry::{ActiveProvider, ProviderRegistry};
pub use stream::{
    BoxedEventStream, ChatChunk, ChatStream, ModelEventStream, StreamEvent, VecEventStream,
};
