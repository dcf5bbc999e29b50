use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::model::{EdgeRecord, ResourceGraph};

/// Counters describing a derive pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveStats {
    /// Reverse edges installed across the graph.
    pub reverse_edges: usize,
    /// Forward edge snapshots rewritten to match their target's current node.
    pub refreshed: usize,
    /// Forward edges whose target is not a graph key (left untouched).
    pub dangling: usize,
}

/// Rebuild every `invoked_by` list from the complete `invokes` edge set.
///
/// Each list is replaced, not merged into, so afterwards every edge A -> B
/// with B in the graph is mirrored by exactly one record for A on B carrying
/// A's current type and account. Forward snapshots are refreshed from the
/// target's current node in the same pass.
pub fn derive_invoked_by(graph: &mut ResourceGraph) -> DeriveStats {
    let mut stats = DeriveStats::default();

    let current: BTreeMap<String, EdgeRecord> =
        graph.iter().map(|(name, resource)| (name.clone(), resource.snapshot(name))).collect();

    let mut reverse: BTreeMap<String, Vec<EdgeRecord>> = BTreeMap::new();
    for (caller, resource) in graph.iter_mut() {
        for edge in resource.invokes.iter_mut() {
            let Some(target) = current.get(&edge.name) else {
                warn!(caller = %caller, callee = %edge.name, "edge target is not in the graph");
                stats.dangling += 1;
                continue;
            };
            if edge != target {
                *edge = target.clone();
                stats.refreshed += 1;
            }
            if let Some(caller_record) = current.get(caller) {
                reverse.entry(edge.name.clone()).or_default().push(caller_record.clone());
            }
        }
    }

    for (name, resource) in graph.iter_mut() {
        resource.invoked_by.clear();
        for caller in reverse.remove(name).unwrap_or_default() {
            resource.upsert_invoked_by(caller);
        }
        stats.reverse_edges += resource.invoked_by.len();
    }

    info!(
        resources = graph.len(),
        reverse_edges = stats.reverse_edges,
        refreshed = stats.refreshed,
        dangling = stats.dangling,
        "derived invoked_by"
    );

    stats
}
