use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use invoke_graph::commands::{build_command, check_command, derive_command, show_command};
use invoke_graph::init_tracing;

/// Invocation graph builder for CloudFormation/SAM templates.
///
/// This CLI is a thin wrapper around `invoke-graph-core` (exposed in code as
/// `invoke_graph_core`). All inference and merging logic lives in the library.
#[derive(Parser, Debug)]
#[command(
    name = "invoke-graph",
    version = invoke_graph_core::version(),
    about = "Build a which-resource-invokes-which graph from CloudFormation templates",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge templates into the graph and rebuild reverse edges.
    ///
    /// Templates are processed in order; later templates overwrite the type
    /// and account of resources that earlier ones also declared. The graph
    /// file is written once, after every template has been merged.
    Build {
        /// Alternating template paths and account labels:
        /// `TEMPLATE ACCOUNT [TEMPLATE ACCOUNT ...]`.
        #[arg(value_name = "TEMPLATE ACCOUNT")]
        pairs: Vec<String>,

        /// Read template/account pairs from a YAML or JSON manifest instead.
        #[arg(long, conflicts_with = "pairs")]
        manifest: Option<PathBuf>,

        /// Graph file to update. Defaults to `resources.json`.
        #[arg(long)]
        graph: Option<PathBuf>,

        /// Extra resource types to treat as identity resources (repeatable).
        #[arg(long = "exclude-type", value_name = "TYPE")]
        exclude_types: Vec<String>,
    },

    /// Rebuild every `invoked_by` list from the persisted forward edges.
    Derive {
        /// Graph file to update. Defaults to `resources.json`.
        #[arg(long)]
        graph: Option<PathBuf>,
    },

    /// Verify every edge names a resource present in the graph.
    Check {
        /// Graph file to read. Defaults to `resources.json`.
        #[arg(long)]
        graph: Option<PathBuf>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show one resource with its callers and callees.
    Show {
        /// Resource name (case-insensitive).
        name: String,

        /// Graph file to read. Defaults to `resources.json`.
        #[arg(long)]
        graph: Option<PathBuf>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { pairs, manifest, graph, exclude_types } => {
            build_command(&pairs, manifest.as_deref(), graph.as_deref(), &exclude_types)?
        }
        Command::Derive { graph } => derive_command(graph.as_deref())?,
        Command::Check { graph, json } => check_command(graph.as_deref(), json)?,
        Command::Show { name, graph, json } => show_command(graph.as_deref(), &name, json)?,
    }

    Ok(())
}
