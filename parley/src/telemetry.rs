//! Process-wide `tracing` subscriber installation.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{GatewayError, GatewayErrorKind};

pub const DEFAULT_FILTER: &str = "info";

/// Installs a formatting subscriber filtered by `RUST_LOG`, else `default_filter`.
///
/// Fails when the filter does not parse or a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> Result<(), GatewayError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|error| {
            GatewayError::new(
                GatewayErrorKind::Config,
                format!("invalid log filter '{default_filter}': {error}"),
            )
        })?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|error| GatewayError::new(GatewayErrorKind::Internal, error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_installation_is_reported() {
        let _ = init_tracing(DEFAULT_FILTER);
        let second = init_tracing(DEFAULT_FILTER);

        assert_eq!(
            second.expect_err("a subscriber is already installed").kind,
            GatewayErrorKind::Internal
        );
    }
}
