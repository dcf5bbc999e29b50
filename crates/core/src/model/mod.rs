//! Core data model for the invocation graph.
//!
//! - `EdgeRecord`: a denormalized snapshot of the other endpoint of an edge.
//! - `Resource`: a graph node with its forward (`invokes`) and reverse
//!   (`invoked_by`) edge lists.
//! - `ResourceGraph`: name -> resource mapping, the unit of persistence.
//!
//! Edge lists are kept sorted by target name and hold at most one record per
//! name. The lists are only ever mutated through the helpers below so that
//! invariant cannot drift.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fallback label for a missing `type` or `account_name` in a persisted graph.
pub const UNKNOWN: &str = "Unknown";

/// Type given to placeholder resources that are referenced but never declared.
pub const EXTERNAL_TYPE: &str = "Unknown/External";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Snapshot of an edge endpoint, stored inline so the graph can be displayed
/// without a second lookup.
///
/// The snapshot is not a live reference: it reflects the endpoint's type and
/// account at the time the edge was last written (by a merge or a derive pass).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub name: String,
    #[serde(rename = "type", default = "unknown")]
    pub resource_type: String,
    #[serde(default = "unknown")]
    pub account_name: String,
}

impl EdgeRecord {
    pub fn new(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            account_name: account_name.into(),
        }
    }
}

/// A graph node. Its name is the key it is stored under in `ResourceGraph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type", default = "unknown")]
    pub resource_type: String,
    #[serde(default = "unknown")]
    pub account_name: String,
    #[serde(default)]
    pub invokes: Vec<EdgeRecord>,
    #[serde(default)]
    pub invoked_by: Vec<EdgeRecord>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            account_name: account_name.into(),
            invokes: Vec::new(),
            invoked_by: Vec::new(),
        }
    }

    /// A bare node for a name that was referenced but never declared.
    pub fn placeholder() -> Self {
        Self::new(EXTERNAL_TYPE, UNKNOWN)
    }

    pub fn is_placeholder(&self) -> bool {
        self.resource_type == EXTERNAL_TYPE
    }

    /// Build the edge record other resources store when pointing at this one.
    pub fn snapshot(&self, name: &str) -> EdgeRecord {
        EdgeRecord::new(name, &self.resource_type, &self.account_name)
    }

    /// Insert or replace the forward edge to `edge.name`.
    pub fn upsert_invoke(&mut self, edge: EdgeRecord) {
        upsert_sorted(&mut self.invokes, edge);
    }

    /// Insert or replace the reverse edge from `edge.name`.
    pub fn upsert_invoked_by(&mut self, edge: EdgeRecord) {
        upsert_sorted(&mut self.invoked_by, edge);
    }

    pub fn invokes_name(&self, name: &str) -> bool {
        self.invokes.iter().any(|e| e.name == name)
    }

    pub fn invoked_by_name(&self, name: &str) -> bool {
        self.invoked_by.iter().any(|e| e.name == name)
    }

    /// Sort both edge lists and collapse duplicates (last record for a name wins).
    ///
    /// Used after loading a hand-edited graph file.
    pub fn normalize_edges(&mut self) {
        for list in [&mut self.invokes, &mut self.invoked_by] {
            let drained: Vec<EdgeRecord> = std::mem::take(&mut *list);
            for edge in drained {
                upsert_sorted(list, edge);
            }
        }
    }
}

fn upsert_sorted(list: &mut Vec<EdgeRecord>, edge: EdgeRecord) {
    match list.binary_search_by(|e| e.name.as_str().cmp(edge.name.as_str())) {
        Ok(idx) => list[idx] = edge,
        Err(idx) => list.insert(idx, edge),
    }
}

/// Mapping from resource name to resource. Names are case-sensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceGraph {
    resources: BTreeMap<String, Resource>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, resource: Resource) -> Option<Resource> {
        self.resources.insert(name.into(), resource)
    }

    /// Return the node for `name`, inserting a placeholder if it is absent.
    pub fn get_or_placeholder(&mut self, name: &str) -> &mut Resource {
        self.resources.entry(name.to_string()).or_insert_with(Resource::placeholder)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Resource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Resource> {
        self.resources.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Total number of forward edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.resources.values().map(|r| r.invokes.len()).sum()
    }

    /// Look a resource up by name, ignoring ASCII case if there is no exact hit.
    ///
    /// Returns the canonical (stored) name alongside the resource. When several
    /// keys differ only by case, the first in key order wins.
    pub fn lookup_case_insensitive(&self, query: &str) -> Option<(&str, &Resource)> {
        if let Some((name, resource)) = self.resources.get_key_value(query) {
            return Some((name.as_str(), resource));
        }
        self.resources
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(query))
            .map(|(name, resource)| (name.as_str(), resource))
    }

    /// Restore the per-list uniqueness and ordering invariants on every node.
    pub fn normalize(&mut self) {
        for resource in self.resources.values_mut() {
            resource.normalize_edges();
        }
    }
}

impl<'a> IntoIterator for &'a ResourceGraph {
    type Item = (&'a String, &'a Resource);
    type IntoIter = btree_map::Iter<'a, String, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
