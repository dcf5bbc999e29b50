use std::path::Path;

use anyhow::{bail, Context, Result};
use invoke_graph_core::graph::{validate_closure, DanglingKind};
use invoke_graph_core::store::GraphStore;

use crate::graph_path_or_default;

/// Report edge records that point at names missing from the graph or at
/// placeholders no template declared.
///
/// Fails (non-zero exit) when any are found.
pub fn check_command(graph: Option<&Path>, json: bool) -> Result<()> {
    let store = GraphStore::new(graph_path_or_default(graph));
    let graph = store
        .load()
        .with_context(|| format!("Failed to load graph {}", store.path().display()))?;
    let dangling = validate_closure(&graph);

    if json {
        println!("{}", serde_json::to_string_pretty(&dangling)?);
    } else if dangling.is_empty() {
        println!("Graph is closed: {} resource(s), {} edge(s).", graph.len(), graph.edge_count());
    } else {
        println!("Dangling references:");
        for reference in &dangling {
            let owners: Vec<&str> = reference.mentioned_by.iter().map(String::as_str).collect();
            let kind = match reference.kind {
                DanglingKind::Missing => "missing",
                DanglingKind::Undeclared => "undeclared",
            };
            println!("  - {} [{kind}] (mentioned by {})", reference.name, owners.join(", "));
        }
    }

    if !dangling.is_empty() {
        bail!("{} dangling reference(s) in {}", dangling.len(), store.path().display());
    }
    Ok(())
}
