//! Operational hook contracts for provider calls.

use std::time::Duration;

use crate::{ProviderError, ProviderId};

pub trait ProviderOperationHooks: Send + Sync {
    fn on_call_start(&self, _provider: &ProviderId, _operation: &str, _model: &str) {}

    fn on_call_success(
        &self,
        _provider: &ProviderId,
        _operation: &str,
        _model: &str,
        _elapsed: Duration,
    ) {
    }

    fn on_call_failure(
        &self,
        _provider: &ProviderId,
        _operation: &str,
        _model: &str,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}
