use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use invoke_graph_core::config::TemplateEntry;
use invoke_graph_core::model::{EdgeRecord, Resource};
use invoke_graph_core::store::DEFAULT_GRAPH_FILE;
use tracing_subscriber::EnvFilter;

pub mod commands;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` selects info and `-vv` debug.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Keep whichever subscriber was installed first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Turn `TEMPLATE ACCOUNT TEMPLATE ACCOUNT ...` into entries.
pub fn pair_entries(args: &[String]) -> Result<Vec<TemplateEntry>> {
    if args.is_empty() {
        bail!("Expected at least one TEMPLATE ACCOUNT pair");
    }
    if args.len() % 2 != 0 {
        let dangling = args.last().map(String::as_str).unwrap_or_default();
        bail!("Template paths and account labels must come in pairs; `{dangling}` has no account");
    }
    Ok(args.chunks(2).map(|pair| TemplateEntry::new(&pair[0], &pair[1])).collect())
}

/// Graph path from an explicit flag, falling back to `resources.json` in the CWD.
pub fn graph_path_or_default(graph: Option<&Path>) -> PathBuf {
    graph.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_GRAPH_FILE))
}

/// Human-readable rendering of one resource and its edges.
pub fn render_resource(name: &str, resource: &Resource) -> String {
    let mut out = String::new();
    out.push_str(&format!("{name}\n"));
    out.push_str(&format!("  Type:    {}\n", resource.resource_type));
    out.push_str(&format!("  Account: {}\n", resource.account_name));
    render_edges(&mut out, "Invokes", &resource.invokes);
    render_edges(&mut out, "Invoked by", &resource.invoked_by);
    out
}

fn render_edges(out: &mut String, label: &str, edges: &[EdgeRecord]) {
    if edges.is_empty() {
        out.push_str(&format!("  {label}: (none)\n"));
        return;
    }
    out.push_str(&format!("  {label}:\n"));
    for edge in edges {
        out.push_str(&format!(
            "    - {} [{}] ({})\n",
            edge.name, edge.resource_type, edge.account_name
        ));
    }
}
