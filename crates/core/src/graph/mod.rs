//! Graph maintenance.
//!
//! - `merge_relations`: fold one template's inferred relations into the graph.
//! - `derive_invoked_by`: rebuild every reverse edge list from the forward edges.
//! - `validate_closure`: report edge records whose names are not graph keys.
//!
//! Merges are additive and may leave edge-record snapshots stale; the derive
//! pass is the single place snapshots are refreshed, so it must run once after
//! the last merge of a batch.

mod derive;
mod merge;
mod validate;

pub use derive::{derive_invoked_by, DeriveStats};
pub use merge::{merge_relations, MergeStats};
pub use validate::{validate_closure, DanglingKind, DanglingReference};
