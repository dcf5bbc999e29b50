use std::fs;

use invoke_graph_core::config::{BatchManifest, TemplateEntry};
use invoke_graph_core::inference::InferenceOptions;
use invoke_graph_core::model::ResourceGraph;
use invoke_graph_core::services::batch::{BatchError, BatchRunner};
use invoke_graph_core::store::{GraphStore, StoreError};
use tempfile::tempdir;

const PRODUCER: &str = r#"
Resources:
  Producer:
    Type: AWS::Lambda::Function
    Properties:
      Environment:
        Variables:
          QUEUE_URL: !Ref WorkQueue
  WorkQueue:
    Type: AWS::SQS::Queue
"#;

const CONSUMER: &str = r#"{
  "Resources": {
    "Consumer": { "Type": "AWS::Lambda::Function" },
    "Trigger": {
      "Type": "AWS::Lambda::EventSourceMapping",
      "Properties": {
        "EventSourceArn": { "Fn::GetAtt": ["WorkQueue", "Arn"] },
        "FunctionName": { "Ref": "Consumer" }
      }
    }
  }
}"#;

#[test]
fn batch_merges_all_templates_then_derives_once() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("producer.yaml"), PRODUCER).expect("write producer");
    fs::write(dir.path().join("consumer.json"), CONSUMER).expect("write consumer");
    let graph_path = dir.path().join("resources.json");

    let runner = BatchRunner::new(GraphStore::new(&graph_path), InferenceOptions::default());
    let report = runner
        .run(&[
            TemplateEntry::new(dir.path().join("producer.yaml"), "Dev"),
            TemplateEntry::new(dir.path().join("consumer.json"), "Prod"),
        ])
        .expect("batch runs");

    assert_eq!(report.templates.len(), 2);
    assert_eq!(report.edges, 2);

    let graph = GraphStore::new(&graph_path).load().expect("reload");
    let queue = graph.get("WorkQueue").expect("queue");
    // The consumer template references the queue without re-declaring it.
    assert_eq!(queue.account_name, "Dev");
    assert!(queue.invokes_name("Consumer"));
    assert!(queue.invoked_by_name("Producer"));
    assert!(graph.get("Consumer").expect("consumer").invoked_by_name("WorkQueue"));
}

#[test]
fn persisted_format_uses_the_documented_field_names() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("producer.yaml"), PRODUCER).expect("write");
    let graph_path = dir.path().join("resources.json");

    BatchRunner::new(GraphStore::new(&graph_path), InferenceOptions::default())
        .run(&[TemplateEntry::new(dir.path().join("producer.yaml"), "Dev")])
        .expect("batch runs");

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&graph_path).expect("read")).expect("json");
    let producer = &raw["Producer"];
    assert_eq!(producer["type"], "AWS::Lambda::Function");
    assert_eq!(producer["account_name"], "Dev");
    assert_eq!(producer["invokes"][0]["name"], "WorkQueue");
    assert_eq!(producer["invokes"][0]["type"], "AWS::SQS::Queue");
    assert_eq!(raw["WorkQueue"]["invoked_by"][0]["name"], "Producer");
}

#[test]
fn persisted_service_callers_carry_a_friendly_type() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("cron.yaml"),
        r#"
Resources:
  Cron:
    Type: AWS::Lambda::Function
  RulePermission:
    Type: AWS::Lambda::Permission
    Properties:
      FunctionName: !Ref Cron
      Principal: events.amazonaws.com
"#,
    )
    .expect("write");
    let graph_path = dir.path().join("resources.json");

    BatchRunner::new(GraphStore::new(&graph_path), InferenceOptions::default())
        .run(&[TemplateEntry::new(dir.path().join("cron.yaml"), "Dev")])
        .expect("batch runs");

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&graph_path).expect("read")).expect("json");
    assert_eq!(raw["EventBridge"]["type"], "EventBridge Service");
    assert_eq!(raw["EventBridge"]["account_name"], "AWS");
    assert_eq!(raw["Cron"]["type"], "AWS::Lambda::Function");
    assert_eq!(raw["Cron"]["invoked_by"][0]["type"], "EventBridge Service");
}

#[test]
fn failed_template_leaves_the_graph_untouched() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("producer.yaml"), PRODUCER).expect("write");
    fs::write(dir.path().join("broken.yaml"), "Resources: [oops").expect("write broken");
    let graph_path = dir.path().join("resources.json");
    let runner = BatchRunner::new(GraphStore::new(&graph_path), InferenceOptions::default());

    runner
        .run(&[TemplateEntry::new(dir.path().join("producer.yaml"), "Dev")])
        .expect("first batch");
    let before = fs::read(&graph_path).expect("read before");

    let err = runner
        .run(&[
            TemplateEntry::new(dir.path().join("producer.yaml"), "Prod"),
            TemplateEntry::new(dir.path().join("broken.yaml"), "Prod"),
        ])
        .expect_err("broken template aborts");
    match err {
        BatchError::Template { path, source } => {
            assert!(path.ends_with("broken.yaml"));
            assert!(source.is_format_error());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(fs::read(&graph_path).expect("read after"), before);
}

#[test]
fn malformed_graph_file_is_not_overwritten() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("producer.yaml"), PRODUCER).expect("write");
    let graph_path = dir.path().join("resources.json");
    fs::write(&graph_path, "not json").expect("write graph");

    let err = BatchRunner::new(GraphStore::new(&graph_path), InferenceOptions::default())
        .run(&[TemplateEntry::new(dir.path().join("producer.yaml"), "Dev")])
        .expect_err("bad graph");
    assert!(matches!(err, BatchError::Store(StoreError::Decode { .. })));
    assert_eq!(fs::read_to_string(&graph_path).expect("read"), "not json");
}

#[test]
fn loading_tolerates_partial_records() {
    let dir = tempdir().expect("tempdir");
    let graph_path = dir.path().join("resources.json");
    fs::write(
        &graph_path,
        r#"{
  "A": { "invokes": [ { "name": "B" }, { "name": "B", "type": "AWS::SQS::Queue" } ] },
  "B": { "type": "AWS::SQS::Queue", "account_name": "Dev" }
}"#,
    )
    .expect("write");

    let graph: ResourceGraph = GraphStore::new(&graph_path).load().expect("load");
    let a = graph.get("A").expect("A");
    assert_eq!(a.resource_type, "Unknown");
    assert_eq!(a.account_name, "Unknown");
    // Duplicates collapse, last record wins.
    assert_eq!(a.invokes.len(), 1);
    assert_eq!(a.invokes[0].resource_type, "AWS::SQS::Queue");
}

#[test]
fn derive_only_run_rebuilds_reverse_edges() {
    let dir = tempdir().expect("tempdir");
    let graph_path = dir.path().join("resources.json");
    fs::write(
        &graph_path,
        r#"{
  "A": { "type": "AWS::Lambda::Function", "account_name": "Dev",
         "invokes": [ { "name": "B", "type": "Unknown", "account_name": "Unknown" } ] },
  "B": { "type": "AWS::SQS::Queue", "account_name": "Dev" }
}"#,
    )
    .expect("write");

    let runner = BatchRunner::new(GraphStore::new(&graph_path), InferenceOptions::default());
    let stats = runner.derive().expect("derive");
    assert_eq!(stats.reverse_edges, 1);
    assert_eq!(stats.refreshed, 1);

    let graph = runner.store().load().expect("reload");
    assert!(graph.get("B").expect("B").invoked_by_name("A"));
    assert_eq!(graph.get("A").expect("A").invokes[0].resource_type, "AWS::SQS::Queue");
}

#[test]
fn manifest_drives_a_batch() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("stacks")).expect("mkdir");
    fs::write(dir.path().join("stacks/producer.yaml"), PRODUCER).expect("write");
    let manifest_path = dir.path().join("batch.yaml");
    fs::write(
        &manifest_path,
        concat!(
            "graph: out/graph.json\n",
            "templates:\n",
            "  - path: stacks/producer.yaml\n",
            "    account: Dev\n",
            "extra_excluded_types: [\"AWS::SQS::Queue\"]\n",
        ),
    )
    .expect("write manifest");

    let manifest = BatchManifest::from_path(&manifest_path).expect("manifest");
    let report = BatchRunner::from_manifest(&manifest).run(&manifest.templates).expect("run");

    assert_eq!(report.graph_path, dir.path().join("out/graph.json"));
    // The queue type is excluded, so the producer has nothing to invoke.
    assert_eq!(report.edges, 0);
    assert!(dir.path().join("out/graph.json").is_file());
}
