//! Built-in bundles shipped with the gateway.
//!
//! ```rust
//! use ptooling::builtins::{clock_bundle, system_bundle};
//! use ptooling::ToolBundle;
//!
//! assert_eq!(clock_bundle().name(), "clock");
//! assert_eq!(system_bundle().tools()[0].definition().name, "system_info");
//! ```

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use pprovider::{ToolDefinition, ToolSchema};
use serde_json::json;

use crate::{BundleFactory, BundleManifest, StaticBundle, StaticBundleSource, ToolBundle};

pub const CLOCK_BUNDLE: &str = "clock";
pub const SYSTEM_BUNDLE: &str = "system";

/// `get_time`: current UTC time as RFC 3339.
pub fn clock_bundle() -> StaticBundle {
    StaticBundle::new(CLOCK_BUNDLE)
        .with_description("Wall-clock time")
        .with_sync_fn(
            ToolDefinition::new(
                "get_time",
                "Returns the current UTC date and time in RFC 3339 format.",
                ToolSchema::new(),
            ),
            |_params, _ctx| {
                Ok(json!({
                    "now": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                }))
            },
        )
}

/// `system_info`: operating system, architecture and family of the host.
pub fn system_bundle() -> StaticBundle {
    StaticBundle::new(SYSTEM_BUNDLE)
        .with_description("Host platform details")
        .with_sync_fn(
            ToolDefinition::new(
                "system_info",
                "Returns the host operating system, CPU architecture and OS family.",
                ToolSchema::new(),
            ),
            |_params, _ctx| {
                Ok(json!({
                    "os": std::env::consts::OS,
                    "arch": std::env::consts::ARCH,
                    "family": std::env::consts::FAMILY,
                }))
            },
        )
}

pub fn builtin_source() -> StaticBundleSource {
    StaticBundleSource::new()
        .with_bundle(clock_bundle())
        .with_bundle(system_bundle())
}

/// Factories for `ManifestDirectorySource`, keyed by bundle name.
pub fn builtin_factories() -> Vec<(String, BundleFactory)> {
    let clock: BundleFactory =
        Arc::new(|_manifest: &BundleManifest| Ok(Arc::new(clock_bundle()) as Arc<dyn ToolBundle>));
    let system: BundleFactory =
        Arc::new(|_manifest: &BundleManifest| Ok(Arc::new(system_bundle()) as Arc<dyn ToolBundle>));

    vec![
        (CLOCK_BUNDLE.to_string(), clock),
        (SYSTEM_BUNDLE.to_string(), system),
    ]
}
