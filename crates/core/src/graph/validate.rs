use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::ResourceGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingKind {
    /// The name is not a top-level key at all.
    Missing,
    /// The name is a key, but only as a placeholder no template declared.
    Undeclared,
}

/// A name some edge record points at that has no real declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub name: String,
    pub kind: DanglingKind,
    /// Resources whose `invokes` or `invoked_by` mention `name`.
    pub mentioned_by: BTreeSet<String>,
}

/// Audit the closure invariant. Findings are reported in name order, never fixed.
pub fn validate_closure(graph: &ResourceGraph) -> Vec<DanglingReference> {
    let mut findings: BTreeMap<String, (DanglingKind, BTreeSet<String>)> = BTreeMap::new();

    for (owner, resource) in graph {
        for edge in resource.invokes.iter().chain(resource.invoked_by.iter()) {
            let kind = match graph.get(&edge.name) {
                None => DanglingKind::Missing,
                Some(target) if target.is_placeholder() => DanglingKind::Undeclared,
                Some(_) => continue,
            };
            findings
                .entry(edge.name.clone())
                .or_insert_with(|| (kind, BTreeSet::new()))
                .1
                .insert(owner.clone());
        }
    }

    findings
        .into_iter()
        .map(|(name, (kind, mentioned_by))| DanglingReference { name, kind, mentioned_by })
        .collect()
}
