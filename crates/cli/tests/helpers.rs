use std::path::{Path, PathBuf};

use invoke_graph::{graph_path_or_default, pair_entries, render_resource};
use invoke_graph_core::model::{EdgeRecord, Resource};

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn pair_entries_groups_template_and_account() {
    let entries = pair_entries(&args(&["a.yaml", "Dev", "b.json", "Prod"])).expect("pairs");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path, PathBuf::from("a.yaml"));
    assert_eq!(entries[1].account, "Prod");
}

#[test]
fn pair_entries_rejects_odd_or_empty_input() {
    let err = pair_entries(&args(&["a.yaml", "Dev", "b.json"])).expect_err("odd");
    assert!(err.to_string().contains("b.json"));
    assert!(pair_entries(&[]).is_err());
}

#[test]
fn graph_path_defaults_to_resources_json() {
    assert_eq!(graph_path_or_default(None), PathBuf::from("resources.json"));
    assert_eq!(graph_path_or_default(Some(Path::new("x/g.json"))), PathBuf::from("x/g.json"));
}

#[test]
fn render_resource_lists_both_directions() {
    let mut resource = Resource::new("AWS::Lambda::Function", "Dev");
    resource.upsert_invoke(EdgeRecord::new("Queue", "AWS::SQS::Queue", "Dev"));

    let text = render_resource("Worker", &resource);
    assert!(text.starts_with("Worker\n"));
    assert!(text.contains("Account: Dev"));
    assert!(text.contains("- Queue [AWS::SQS::Queue] (Dev)"));
    assert!(text.contains("Invoked by: (none)"));
}
