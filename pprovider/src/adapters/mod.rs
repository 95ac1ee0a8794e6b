#[cfg(feature = "provider-openai")]
pub mod openai;

#[cfg(feature = "provider-anthropic")]
pub mod anthropic;

#[cfg(feature = "provider-ollama")]
pub mod ollama;

use crate::ProviderDescriptor;

/// Descriptors for every adapter compiled into this build.
pub fn builtin_descriptors() -> Vec<ProviderDescriptor> {
    #[allow(unused_mut)]
    let mut descriptors = Vec::new();

    #[cfg(feature = "provider-openai")]
    descriptors.push(openai::descriptor());

    #[cfg(feature = "provider-anthropic")]
    descriptors.push(anthropic::descriptor());

    #[cfg(feature = "provider-ollama")]
    descriptors.push(ollama::descriptor());

    descriptors
}
