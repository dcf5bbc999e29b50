//! invoke-graph-core
//!
//! Core library for building a "which resource invokes which" graph out of
//! CloudFormation/SAM templates.
//!
//! Pipeline, per template and account label:
//! - `template`: load YAML or JSON into resource declarations.
//! - `intrinsics`: resolve `Ref`, `Fn::GetAtt` and `Fn::Sub` to logical names.
//! - `inference`: turn declarations into caller -> callee edges.
//! - `graph`: merge edges into the persisted graph, then derive `invoked_by`.
//! - `store`: load and atomically save the graph file.
//!
//! All substantive logic lives here so it is testable without the CLI.

pub mod config;
pub mod graph;
pub mod inference;
pub mod intrinsics;
pub mod model;
pub mod services;
pub mod store;
pub mod template;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
