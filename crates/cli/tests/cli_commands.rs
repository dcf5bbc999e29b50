use std::fs;
use std::path::Path;

use predicates::prelude::*;
use tempfile::tempdir;

const ORDERS: &str = r#"
Resources:
  OrdersFn:
    Type: AWS::Lambda::Function
    Properties:
      Role: !GetAtt OrdersRole.Arn
      Environment:
        Variables:
          TABLE: !Ref OrdersTable
  OrdersRole:
    Type: AWS::IAM::Role
  OrdersTable:
    Type: AWS::DynamoDB::Table
  OrdersQueue:
    Type: AWS::SQS::Queue
  Trigger:
    Type: AWS::Lambda::EventSourceMapping
    Properties:
      EventSourceArn: !GetAtt OrdersQueue.Arn
      FunctionName: !Ref OrdersFn
"#;

const REPORTS: &str = r#"
Resources:
  ReportsFn:
    Type: AWS::Lambda::Function
    Properties:
      Environment:
        Variables:
          ARCHIVE: !Ref ArchiveBucket
"#;

fn write_templates(root: &Path) {
    fs::write(root.join("orders.yaml"), ORDERS).expect("write orders");
    fs::write(root.join("reports.yaml"), REPORTS).expect("write reports");
}

fn read_graph(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read graph")).expect("graph json")
}

#[test]
fn version_flag_reports_the_library_version() {
    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(invoke_graph_core::version()));
}

#[test]
fn build_writes_default_graph_in_cwd() {
    let dir = tempdir().expect("tempdir");
    write_templates(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["build", "orders.yaml", "Dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated graph"));

    let graph = read_graph(&dir.path().join("resources.json"));
    assert_eq!(graph["OrdersFn"]["invokes"][0]["name"], "OrdersTable");
    assert_eq!(graph["OrdersFn"]["invoked_by"][0]["name"], "OrdersQueue");
    assert_eq!(graph["OrdersTable"]["invoked_by"][0]["account_name"], "Dev");
    // Roles are never invocation targets.
    let invokes = graph["OrdersFn"]["invokes"].as_array().expect("array");
    assert!(invokes.iter().all(|e| e["name"] != "OrdersRole"));
}

#[test]
fn build_rejects_unpaired_arguments() {
    let dir = tempdir().expect("tempdir");
    write_templates(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["build", "orders.yaml", "Dev", "reports.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pairs"));
    assert!(!dir.path().join("resources.json").exists());
}

#[test]
fn broken_template_keeps_previous_graph() {
    let dir = tempdir().expect("tempdir");
    write_templates(dir.path());
    fs::write(dir.path().join("broken.yaml"), "Resources: [nope").expect("write broken");
    let graph = dir.path().join("g.json");

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .args(["build", "--graph"])
        .arg(&graph)
        .arg(dir.path().join("orders.yaml"))
        .arg("Dev")
        .assert()
        .success();
    let before = fs::read(&graph).expect("read before");

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .args(["build", "--graph"])
        .arg(&graph)
        .arg(dir.path().join("reports.yaml"))
        .arg("Prod")
        .arg(dir.path().join("broken.yaml"))
        .arg("Prod")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.yaml"));

    assert_eq!(fs::read(&graph).expect("read after"), before);
}

#[test]
fn check_flags_placeholders_and_passes_once_declared() {
    let dir = tempdir().expect("tempdir");
    write_templates(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["build", "reports.yaml", "Prod"])
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ArchiveBucket [undeclared]"));

    fs::write(
        dir.path().join("storage.yaml"),
        "Resources:\n  ArchiveBucket:\n    Type: AWS::S3::Bucket\n",
    )
    .expect("write storage");
    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["build", "storage.yaml", "Prod"])
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["check", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn show_is_case_insensitive() {
    let dir = tempdir().expect("tempdir");
    write_templates(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["build", "orders.yaml", "Dev", "reports.yaml", "Prod"])
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["show", "ordersfn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OrdersFn"))
        .stdout(predicate::str::contains("OrdersTable [AWS::DynamoDB::Table] (Dev)"))
        .stdout(predicate::str::contains("OrdersQueue [AWS::SQS::Queue] (Dev)"));

    let output = assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["show", "REPORTSFN", "--json"])
        .output()
        .expect("run show");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["name"], "ReportsFn");
    assert_eq!(value["account_name"], "Prod");

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .args(["show", "Nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn manifest_build_and_derive() {
    let dir = tempdir().expect("tempdir");
    write_templates(dir.path());
    fs::write(
        dir.path().join("batch.yaml"),
        concat!(
            "graph: graph.json\n",
            "templates:\n",
            "  - path: orders.yaml\n",
            "    account: Dev\n",
            "  - path: reports.yaml\n",
            "    account: Prod\n",
        ),
    )
    .expect("write manifest");

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .args(["build", "--manifest"])
        .arg(dir.path().join("batch.yaml"))
        .assert()
        .success();
    let graph_path = dir.path().join("graph.json");
    let graph = read_graph(&graph_path);
    assert_eq!(graph["ReportsFn"]["account_name"], "Prod");

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .args(["derive", "--graph"])
        .arg(&graph_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Reverse edges: 3"));
}

#[test]
fn verbose_logs_go_to_stderr() {
    let dir = tempdir().expect("tempdir");
    write_templates(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("invoke-graph")
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["-v", "build", "orders.yaml", "Dev"])
        .assert()
        .success()
        .stderr(predicate::str::contains("merged template relations"))
        .stdout(predicate::str::contains("merged template relations").not());
}
