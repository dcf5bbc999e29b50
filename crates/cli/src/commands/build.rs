use std::path::Path;

use anyhow::{bail, Context, Result};
use invoke_graph_core::config::BatchManifest;
use invoke_graph_core::inference::InferenceOptions;
use invoke_graph_core::services::batch::{BatchReport, BatchRunner};
use invoke_graph_core::store::GraphStore;

use crate::{graph_path_or_default, pair_entries};

/// Merge templates into the graph and rebuild reverse edges.
///
/// Either `pairs` (TEMPLATE ACCOUNT ...) or a manifest is given, never both.
/// An explicit `--graph` overrides the manifest's graph path.
pub fn build_command(
    pairs: &[String],
    manifest: Option<&Path>,
    graph: Option<&Path>,
    extra_excluded_types: &[String],
) -> Result<()> {
    let (runner, entries) = match manifest {
        Some(manifest_path) => {
            if !pairs.is_empty() {
                bail!("Pass either TEMPLATE ACCOUNT pairs or --manifest, not both");
            }
            let mut manifest = BatchManifest::from_path(manifest_path).with_context(|| {
                format!("Failed to load manifest {}", manifest_path.display())
            })?;
            manifest.extra_excluded_types.extend(extra_excluded_types.iter().cloned());
            if let Some(graph) = graph {
                manifest.graph = graph.to_path_buf();
            }
            (BatchRunner::from_manifest(&manifest), manifest.templates)
        }
        None => {
            let entries = pair_entries(pairs)?;
            let options = InferenceOptions::default()
                .with_extra_excluded_types(extra_excluded_types.iter().cloned());
            let store = GraphStore::new(graph_path_or_default(graph));
            (BatchRunner::new(store, options), entries)
        }
    };

    let report = runner
        .run(&entries)
        .with_context(|| format!("Failed to update graph {}", runner.store().path().display()))?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("Updated graph: {}", report.graph_path.display());
    for outcome in &report.templates {
        println!(
            "  - {} [{}]: {} edge(s), {} new resource(s), {} placeholder(s), {} warning(s)",
            outcome.path.display(),
            outcome.account,
            outcome.edges,
            outcome.merge.inserted,
            outcome.merge.placeholders,
            outcome.warnings
        );
    }
    println!("Resources: {}", report.resources);
    println!("Edges: {}", report.edges);
    if report.derive.dangling > 0 {
        println!("Dangling edges: {} (run `check` for details)", report.derive.dangling);
    }
}
