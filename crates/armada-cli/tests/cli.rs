//! End-to-end tests for the `armada` binary.

use std::path::Path;
use std::process::{Command, Output};

use armada_cluster::{
    default_config, parse_node_id, validate_cluster_id, ClusterConfig, Snapshot,
};

/// Runs the built binary with colors and logging turned down.
fn armada(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_armada"))
        .args(args)
        .arg("--no-color")
        .env("RUST_LOG", "error")
        .env_remove("ARMADA_CLUSTER_ID")
        .env_remove("ARMADA_ENV")
        .output()
        .expect("failed to run armada")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_file(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

/// Five nodes: four online at 50/50/75/95% cpu and one offline.
const SNAPSHOT: &str = r#"{
  "cluster": {
    "id": "c1",
    "name": "orders",
    "status": "active",
    "config": { "max_nodes": 5 }
  },
  "nodes": [
    { "id": "n100", "status": "online", "priority": 100,
      "capacity": { "cpu": 10, "memory": 10, "storage": 10, "network": 10 },
      "usage": { "cpu": 5, "memory": 1, "storage": 1, "network": 1 } },
    { "id": "n80", "status": "online", "priority": 80,
      "capacity": { "cpu": 10, "memory": 10, "storage": 10, "network": 10 },
      "usage": { "cpu": 5, "memory": 1, "storage": 1, "network": 1 } },
    { "id": "n60", "status": "online", "priority": 60,
      "capacity": { "cpu": 10, "memory": 10, "storage": 10, "network": 10 },
      "usage": { "cpu": 7.5, "memory": 1, "storage": 1, "network": 1 } },
    { "id": "n40", "status": "online", "priority": 40,
      "capacity": { "cpu": 10, "memory": 10, "storage": 10, "network": 10 },
      "usage": { "cpu": 9.5, "memory": 1, "storage": 1, "network": 1 } },
    { "id": "n20", "status": "offline", "priority": 20,
      "capacity": { "cpu": 10, "memory": 10, "storage": 10, "network": 10 } }
  ]
}"#;

// -- ids --

#[test]
fn generated_cluster_id_is_valid() {
    let output = armada(&["id", "cluster"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let id = stdout(&output).trim().to_string();
    assert!(validate_cluster_id(&id), "bad id: {id}");
}

#[test]
fn generated_node_id_embeds_cluster() {
    let cluster = "cluster-abcd1234-2024-03-05-10-20-30-wxyz9876";
    let output = armada(&["id", "node", "--cluster", cluster, "--number", "7"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let id = stdout(&output).trim().to_string();
    let parsed = parse_node_id(&id).unwrap();
    assert_eq!(parsed.cluster_suffix, "abcd1234-2024");
    assert_eq!(parsed.node_number, 7);
}

#[test]
fn node_id_for_bad_cluster_fails() {
    let output = armada(&["id", "node", "--cluster", "nope", "--number", "1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not a valid cluster id"));
}

#[test]
fn parse_prints_components() {
    let output = armada(&["id", "parse", "cluster-abcd1234-2024-03-05-10-20-30-wxyz9876"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("cluster"));
    assert!(out.contains("wxyz9876"));
    assert!(out.contains("2024-03-05T10:20:30+00:00"));
}

#[test]
fn parse_rejects_uppercase() {
    let output = armada(&["id", "parse", "cluster-AB-2024-01-01-00-00-00-cdefghij"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("not a valid cluster or node id"));
}

// -- config --

#[test]
fn default_config_round_trips() {
    let output = armada(&["config", "default"]);
    assert!(output.status.success());
    let config = ClusterConfig::from_toml_str(&stdout(&output)).unwrap();
    assert_eq!(config, default_config());
}

#[test]
fn production_template() {
    let output = armada(&["config", "template", "production"]);
    assert!(output.status.success());
    let config = ClusterConfig::from_toml_str(&stdout(&output)).unwrap();
    assert_eq!(config.max_nodes, 20);
}

#[test]
fn unknown_environment_fails() {
    let output = armada(&["config", "template", "moon"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown environment"));
}

#[test]
fn validate_lists_every_violation() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "bad.toml",
        "max_nodes = 0\nhealth_check_interval_secs = 2\n",
    );
    let output = armada(&["config", "validate", &file]);
    assert!(!output.status.success());
    let out = stdout(&output);
    assert!(out.contains("max_nodes must be at least 1"), "got: {out}");
    assert!(out.contains("health_check_interval_secs must be at least 5"), "got: {out}");
}

#[test]
fn validate_accepts_good_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "good.toml", "max_nodes = 3\n");
    let output = armada(&["config", "validate", &file]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("configuration is valid"));
}

#[test]
fn merge_overlays_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "partial.toml", "max_nodes = 3\nauto_scaling = true\n");
    let output = armada(&["config", "merge", &file]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let merged = ClusterConfig::from_toml_str(&stdout(&output)).unwrap();
    assert_eq!(merged.max_nodes, 3);
    assert!(merged.auto_scaling);
    assert_eq!(merged.max_tenants, default_config().max_tenants);
}

#[test]
fn missing_config_file_fails() {
    let output = armada(&["config", "validate", "/definitely/not/here.toml"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("error:"));
}

// -- evaluate / refresh --

#[test]
fn evaluate_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "snapshot.json", SNAPSHOT);
    let output = armada(&["evaluate", &file, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let score = report["health"]["score"].as_f64().unwrap();
    assert!((score - 0.62).abs() < 1e-9, "score {score}");
    assert_eq!(report["health"]["suggested_status"], "maintenance");
    assert_eq!(report["failover"]["primary_candidate"], "n100");
    assert_eq!(report["role_assignment"]["coordinator"], "n100");
}

#[test]
fn evaluate_text_report() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "snapshot.json", SNAPSHOT);
    let output = armada(&["evaluate", &file]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("0.62 -> maintenance"), "got: {out}");
    assert!(out.contains("n100 > n80 > n60 > n40"), "got: {out}");
}

#[test]
fn evaluate_rejects_bad_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "snapshot.json", "{ not json");
    let output = armada(&["evaluate", &file]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid snapshot"));
}

#[test]
fn refresh_writes_updated_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "snapshot.json", SNAPSHOT);
    let out_path = dir.path().join("refreshed.json");
    let output = armada(&["refresh", &input, "--output", &out_path.to_string_lossy()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("primary_elected"));

    let refreshed = Snapshot::from_file(&out_path).unwrap();
    assert!((refreshed.cluster.health_score - 0.62).abs() < 1e-9);
    assert!(refreshed.cluster.last_health_check.is_some());
    let primaries: Vec<&str> = refreshed
        .nodes
        .iter()
        .filter(|n| n.is_primary)
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(primaries, vec!["n100"]);
}
