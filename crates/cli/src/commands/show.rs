use std::path::Path;

use anyhow::{anyhow, Context, Result};
use invoke_graph_core::model::Resource;
use invoke_graph_core::store::GraphStore;
use serde::Serialize;

use crate::{graph_path_or_default, render_resource};

#[derive(Serialize)]
struct NamedResource<'a> {
    name: &'a str,
    #[serde(flatten)]
    resource: &'a Resource,
}

/// Print one resource and its edges. The name is matched case-insensitively.
pub fn show_command(graph: Option<&Path>, name: &str, json: bool) -> Result<()> {
    let store = GraphStore::new(graph_path_or_default(graph));
    let graph = store
        .load()
        .with_context(|| format!("Failed to load graph {}", store.path().display()))?;
    let (canonical, resource) = graph
        .lookup_case_insensitive(name)
        .ok_or_else(|| anyhow!("Resource `{name}` not found in {}", store.path().display()))?;

    if json {
        let named = NamedResource { name: canonical, resource };
        println!("{}", serde_json::to_string_pretty(&named)?);
    } else {
        print!("{}", render_resource(canonical, resource));
    }
    Ok(())
}
