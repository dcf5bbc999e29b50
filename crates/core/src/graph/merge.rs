use tracing::{debug, info};

use crate::inference::TemplateRelations;
use crate::model::{Resource, ResourceGraph};

/// Counters describing what a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Declared resources that were not in the graph yet.
    pub inserted: usize,
    /// Existing resources whose type or account label changed.
    pub relabeled: usize,
    /// Referenced-only names inserted as placeholders.
    pub placeholders: usize,
    /// Forward edges that did not exist before.
    pub edges_added: usize,
}

/// Fold `relations` into `graph`.
///
/// Declared resources overwrite type and account (last write wins). Edges are
/// unioned by target name, with the newest snapshot replacing an older one.
/// Nothing is ever removed. `invoked_by` is left alone; run
/// `derive_invoked_by` once the batch is complete.
pub fn merge_relations(graph: &mut ResourceGraph, relations: &TemplateRelations) -> MergeStats {
    let mut stats = MergeStats::default();

    for (name, declared) in &relations.declared {
        match graph.get_mut(name) {
            Some(existing) => {
                if existing.resource_type != declared.resource_type
                    || existing.account_name != declared.account_name
                {
                    debug!(
                        resource = %name,
                        from_account = %existing.account_name,
                        to_account = %declared.account_name,
                        "relabeling resource"
                    );
                    existing.resource_type = declared.resource_type.clone();
                    existing.account_name = declared.account_name.clone();
                    stats.relabeled += 1;
                }
            }
            None => {
                graph.insert(
                    name.clone(),
                    Resource::new(&declared.resource_type, &declared.account_name),
                );
                stats.inserted += 1;
            }
        }
    }

    for edge in &relations.edges {
        // The callee must exist before its snapshot can be taken.
        if !graph.contains(&edge.callee) {
            graph.insert(edge.callee.clone(), Resource::placeholder());
            stats.placeholders += 1;
        }
        let record = match graph.get(&edge.callee) {
            Some(callee) => callee.snapshot(&edge.callee),
            None => Resource::placeholder().snapshot(&edge.callee),
        };

        if !graph.contains(&edge.caller) {
            stats.placeholders += 1;
        }
        let caller = graph.get_or_placeholder(&edge.caller);
        if !caller.invokes_name(&edge.callee) {
            stats.edges_added += 1;
        }
        caller.upsert_invoke(record);
    }

    info!(
        account = %relations.account_name,
        inserted = stats.inserted,
        relabeled = stats.relabeled,
        placeholders = stats.placeholders,
        edges_added = stats.edges_added,
        "merged template relations"
    );

    stats
}
