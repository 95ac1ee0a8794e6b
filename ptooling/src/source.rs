//! Bundle discovery sources.
//!
//! A [`BundleSource`] produces candidate bundles; the registry validates and
//! registers them. [`ManifestDirectorySource`] reads `*.json` manifests and builds
//! bundles through factories registered by name, so no code is loaded from disk.
//!
//! ```rust
//! use ptooling::BundleManifest;
//!
//! let manifest: BundleManifest =
//!     serde_json::from_str(r#"{"name":"clock","settings":{"zone":"utc"}}"#).unwrap();
//! assert!(manifest.enabled);
//! assert_eq!(manifest.factory_name(), "clock");
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{Tool, ToolBundle, ToolError, ToolFuture};

/// Candidate that failed before it could become a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedBundle {
    pub name: String,
    pub reason: String,
}

impl RejectedBundle {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Default)]
pub struct Discovery {
    pub bundles: Vec<Arc<dyn ToolBundle>>,
    pub rejected: Vec<RejectedBundle>,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field(
                "bundles",
                &self
                    .bundles
                    .iter()
                    .map(|bundle| bundle.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("rejected", &self.rejected)
            .finish()
    }
}

pub trait BundleSource: Send + Sync {
    fn discover<'a>(&'a self) -> ToolFuture<'a, Result<Discovery, ToolError>>;
}

/// Source over a fixed list of bundles.
#[derive(Default, Clone)]
pub struct StaticBundleSource {
    bundles: Vec<Arc<dyn ToolBundle>>,
}

impl StaticBundleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle<B>(mut self, bundle: B) -> Self
    where
        B: ToolBundle + 'static,
    {
        self.bundles.push(Arc::new(bundle));
        self
    }

    pub fn with_shared_bundle(mut self, bundle: Arc<dyn ToolBundle>) -> Self {
        self.bundles.push(bundle);
        self
    }
}

impl BundleSource for StaticBundleSource {
    fn discover<'a>(&'a self) -> ToolFuture<'a, Result<Discovery, ToolError>> {
        Box::pin(async move {
            Ok(Discovery {
                bundles: self.bundles.clone(),
                rejected: Vec::new(),
            })
        })
    }
}

fn enabled_by_default() -> bool {
    true
}

/// On-disk description of one bundle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BundleManifest {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Factory to build the bundle with; defaults to `name`.
    #[serde(default)]
    pub factory: Option<String>,
    #[serde(default)]
    pub settings: Value,
}

impl BundleManifest {
    pub fn factory_name(&self) -> &str {
        self.factory.as_deref().unwrap_or(self.name.as_str())
    }
}

pub type BundleFactory =
    Arc<dyn Fn(&BundleManifest) -> Result<Arc<dyn ToolBundle>, ToolError> + Send + Sync>;

/// Reads `*.json` manifests from a directory, in file-name order.
///
/// A missing directory discovers nothing.
#[derive(Clone)]
pub struct ManifestDirectorySource {
    directory: PathBuf,
    factories: HashMap<String, BundleFactory>,
}

impl ManifestDirectorySource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            factories: HashMap::new(),
        }
    }

    pub fn with_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&BundleManifest) -> Result<Arc<dyn ToolBundle>, ToolError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn with_factories<I>(mut self, factories: I) -> Self
    where
        I: IntoIterator<Item = (String, BundleFactory)>,
    {
        self.factories.extend(factories);
        self
    }

    pub fn directory(&self) -> &Path {
        self.directory.as_path()
    }

    async fn manifest_paths(&self) -> Result<Vec<PathBuf>, ToolError> {
        let exists = tokio::fs::try_exists(&self.directory).await.unwrap_or(false);
        if !exists {
            tracing::debug!(
                directory = %self.directory.display(),
                "bundle manifest directory does not exist"
            );
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.directory).await.map_err(|err| {
            ToolError::discovery(format!(
                "failed to read manifest directory '{}': {err}",
                self.directory.display()
            ))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|err| {
            ToolError::discovery(format!("failed to read manifest entry: {err}"))
        })? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let is_file = tokio::fs::metadata(&path)
                .await
                .is_ok_and(|metadata| metadata.is_file());
            if is_file {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn build(&self, manifest: BundleManifest) -> Result<Arc<dyn ToolBundle>, String> {
        if manifest.name.trim().is_empty() {
            return Err("manifest name must not be empty".to_string());
        }

        let factory = self
            .factories
            .get(manifest.factory_name())
            .ok_or_else(|| format!("unknown bundle factory '{}'", manifest.factory_name()))?;

        let inner = factory(&manifest).map_err(|err| err.to_string())?;
        Ok(Arc::new(ManifestBundle {
            name: manifest.name,
            enabled: manifest.enabled,
            inner,
        }))
    }
}

impl BundleSource for ManifestDirectorySource {
    fn discover<'a>(&'a self) -> ToolFuture<'a, Result<Discovery, ToolError>> {
        Box::pin(async move {
            let mut discovery = Discovery::default();

            for path in self.manifest_paths().await? {
                let label = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());

                let manifest = match read_manifest(&path).await {
                    Ok(manifest) => manifest,
                    Err(reason) => {
                        discovery.rejected.push(RejectedBundle::new(label, reason));
                        continue;
                    }
                };

                let name = manifest.name.clone();
                match self.build(manifest) {
                    Ok(bundle) => discovery.bundles.push(bundle),
                    Err(reason) => {
                        let name = if name.trim().is_empty() { label } else { name };
                        discovery.rejected.push(RejectedBundle::new(name, reason));
                    }
                }
            }

            Ok(discovery)
        })
    }
}

async fn read_manifest(path: &Path) -> Result<BundleManifest, String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| format!("unreadable manifest: {err}"))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid manifest: {err}"))
}

/// Applies the manifest's name and enabled flag over a factory-built bundle.
struct ManifestBundle {
    name: String,
    enabled: bool,
    inner: Arc<dyn ToolBundle>,
}

impl ToolBundle for ManifestBundle {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn enabled(&self) -> bool {
        self.enabled && self.inner.enabled()
    }

    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.inner.tools()
    }

    fn cleanup<'a>(&'a self) -> ToolFuture<'a, ()> {
        self.inner.cleanup()
    }
}
