use std::path::Path;

use anyhow::{Context, Result};
use invoke_graph_core::inference::InferenceOptions;
use invoke_graph_core::services::batch::BatchRunner;
use invoke_graph_core::store::GraphStore;

use crate::graph_path_or_default;

/// Rebuild `invoked_by` (and refresh edge snapshots) without parsing templates.
pub fn derive_command(graph: Option<&Path>) -> Result<()> {
    let store = GraphStore::new(graph_path_or_default(graph));
    let runner = BatchRunner::new(store, InferenceOptions::default());
    let stats = runner
        .derive()
        .with_context(|| format!("Failed to derive graph {}", runner.store().path().display()))?;

    println!("Derived reverse edges: {}", runner.store().path().display());
    println!("  Reverse edges: {}", stats.reverse_edges);
    println!("  Refreshed snapshots: {}", stats.refreshed);
    println!("  Dangling edges: {}", stats.dangling);
    Ok(())
}
