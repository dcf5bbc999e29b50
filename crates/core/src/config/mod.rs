//! Batch manifests: the templates to process and the graph to update.
//!
//! A manifest is YAML (or JSON when the file ends in `.json`):
//!
//! ```yaml
//! graph: resources.json
//! templates:
//!   - path: stacks/orders.yaml
//!     account: Dev
//!   - path: stacks/billing.yaml
//!     account: Prod
//! extra_excluded_types:
//!   - AWS::KMS::Key
//! ```
//!
//! Relative paths are resolved against the manifest's own directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::InferenceOptions;
use crate::store::DEFAULT_GRAPH_FILE;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest YAML")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse manifest JSON")]
    Json(#[from] serde_json::Error),
    #[error("manifest {0} lists no templates")]
    Empty(PathBuf),
}

/// One template + account pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub path: PathBuf,
    /// Account label applied to every resource the template declares.
    pub account: String,
}

impl TemplateEntry {
    pub fn new(path: impl Into<PathBuf>, account: impl Into<String>) -> Self {
        Self { path: path.into(), account: account.into() }
    }
}

fn default_graph() -> PathBuf {
    PathBuf::from(DEFAULT_GRAPH_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchManifest {
    #[serde(default = "default_graph")]
    pub graph: PathBuf,
    pub templates: Vec<TemplateEntry>,
    /// Identity-like types excluded on top of the built-in list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_excluded_types: Vec<String>,
}

impl BatchManifest {
    /// Read a manifest and resolve its relative paths.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;

        let mut manifest: BatchManifest =
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                serde_json::from_slice(&bytes)?
            } else {
                serde_yaml::from_slice(&bytes)?
            };
        if manifest.templates.is_empty() {
            return Err(ManifestError::Empty(path.to_path_buf()));
        }

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        manifest.resolve_relative_to(base);
        Ok(manifest)
    }

    /// Rewrite relative graph and template paths as `base.join(path)`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if self.graph.is_relative() {
            self.graph = base.join(&self.graph);
        }
        for entry in &mut self.templates {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
    }

    pub fn inference_options(&self) -> InferenceOptions {
        InferenceOptions::default().with_extra_excluded_types(self.extra_excluded_types.clone())
    }
}
