//! On-disk persistence of the resource graph.
//!
//! The graph is a single pretty-printed JSON document keyed by logical name.
//! Saves go through a temporary file in the target directory followed by a
//! rename, so a failed save never leaves a half-written graph behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::ResourceGraph;

/// Default graph file name, relative to the working directory or manifest.
pub const DEFAULT_GRAPH_FILE: &str = "resources.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access graph file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("graph file {path} is not a valid resource graph")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize resource graph")]
    Encode(#[source] serde_json::Error),
    #[error("failed to replace graph file {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Location of a persisted graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStore {
    path: PathBuf,
}

impl GraphStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the graph. A missing file is an empty graph; an unreadable or
    /// malformed one is an error.
    pub fn load(&self) -> StoreResult<ResourceGraph> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "graph file absent, starting empty");
                return Ok(ResourceGraph::new());
            }
            Err(source) => return Err(StoreError::Io { path: self.path.clone(), source }),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ResourceGraph::new());
        }

        let mut graph: ResourceGraph = serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Decode { path: self.path.clone(), source })?;
        graph.normalize();
        info!(path = %self.path.display(), resources = graph.len(), "loaded resource graph");
        Ok(graph)
    }

    /// Atomically replace the graph file with `graph`.
    pub fn save(&self, graph: &ResourceGraph) -> StoreResult<()> {
        let mut json = serde_json::to_string_pretty(graph).map_err(StoreError::Encode)?;
        json.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|source| StoreError::Io { path: dir.clone(), source })?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|source| StoreError::Io { path: tmp.path().to_path_buf(), source })?;
        tmp.persist(&self.path)
            .map_err(|source| StoreError::Persist { path: self.path.clone(), source })?;

        info!(path = %self.path.display(), resources = graph.len(), "saved resource graph");
        Ok(())
    }
}
