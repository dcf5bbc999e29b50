use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, info_span};

use crate::config::{BatchManifest, ManifestError, TemplateEntry};
use crate::graph::{derive_invoked_by, merge_relations, DeriveStats, MergeStats};
use crate::inference::{InferenceEngine, InferenceOptions};
use crate::model::ResourceGraph;
use crate::store::{GraphStore, StoreError};
use crate::template::{Template, TemplateError};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to load template {path}")]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
}

/// Per-template outcome of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOutcome {
    pub path: PathBuf,
    pub account: String,
    pub edges: usize,
    pub warnings: usize,
    pub merge: MergeStats,
}

/// Summary of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub graph_path: PathBuf,
    pub templates: Vec<TemplateOutcome>,
    pub derive: DeriveStats,
    pub resources: usize,
    pub edges: usize,
}

/// Load -> (parse, infer, merge)* -> derive -> save.
///
/// The graph is written once, after every template has merged. Any failure
/// returns early and leaves the persisted graph untouched.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    engine: InferenceEngine,
    store: GraphStore,
}

impl BatchRunner {
    pub fn new(store: GraphStore, options: InferenceOptions) -> Self {
        Self { engine: InferenceEngine::new(options), store }
    }

    pub fn from_manifest(manifest: &BatchManifest) -> Self {
        Self::new(GraphStore::new(&manifest.graph), manifest.inference_options())
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn run(&self, entries: &[TemplateEntry]) -> Result<BatchReport, BatchError> {
        let mut graph = self.store.load()?;
        let templates = apply_templates(&self.engine, &mut graph, entries)?;
        let derive = derive_invoked_by(&mut graph);
        self.store.save(&graph)?;

        Ok(BatchReport {
            graph_path: self.store.path().to_path_buf(),
            templates,
            derive,
            resources: graph.len(),
            edges: graph.edge_count(),
        })
    }

    /// Re-run only the reverse-edge pass over the persisted graph.
    pub fn derive(&self) -> Result<DeriveStats, BatchError> {
        let mut graph = self.store.load()?;
        let stats = derive_invoked_by(&mut graph);
        self.store.save(&graph)?;
        Ok(stats)
    }
}

/// Parse, infer and merge every entry into `graph`, in order.
///
/// Does not derive reverse edges; callers run `derive_invoked_by` once after
/// the last entry.
pub fn apply_templates(
    engine: &InferenceEngine,
    graph: &mut ResourceGraph,
    entries: &[TemplateEntry],
) -> Result<Vec<TemplateOutcome>, BatchError> {
    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        let span = info_span!("template", path = %entry.path.display(), account = %entry.account);
        let _guard = span.enter();

        let template = Template::from_path(&entry.path)
            .map_err(|source| BatchError::Template { path: entry.path.clone(), source })?;
        let relations = engine.infer(&template, &entry.account);
        let merge = merge_relations(graph, &relations);

        outcomes.push(TemplateOutcome {
            path: entry.path.clone(),
            account: entry.account.clone(),
            edges: relations.edges.len(),
            warnings: relations.warnings.len(),
            merge,
        });
    }
    info!(templates = outcomes.len(), resources = graph.len(), "applied templates");
    Ok(outcomes)
}
