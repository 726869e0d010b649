mod common;

use common::{fct, write, Workspace, NOW};
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;

#[test]
fn choosing_a_non_candidate_is_a_conflict() {
    let ws = Workspace::new();
    let (ok, body) = ws.run_raw(&["build", "DEN-3", "--choose", "DEN-3=LCSET-9", "--now", NOW]);
    assert!(!ok);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "conflict");
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("LCSET-9 is not a candidate LCSET for tube DEN-3"));
    assert_eq!(body["error"]["next_actions"][0]["action"], "resolve");
    assert!(!ws.path("session.json").exists());
}

#[test]
fn editing_an_unknown_tube_is_not_found() {
    let ws = Workspace::new();
    ws.run(&["build", "DEN-1", "--now", NOW]);
    let (ok, body) = ws.run_raw(&[
        "edit",
        "--barcode",
        "DEN-9",
        "--template",
        r#"{"number_lanes":2}"#,
    ]);
    assert!(!ok);
    assert_eq!(body["error"]["code"], "not_found");
}

#[test]
fn empty_templates_and_unknown_fields_are_invalid() {
    let ws = Workspace::new();
    ws.run(&["build", "DEN-1", "--now", NOW]);

    let (ok, body) = ws.run_raw(&["edit", "--all", "--template", "{}"]);
    assert!(!ok);
    assert_eq!(body["error"]["code"], "invalid_request");

    let (ok, body) = ws.run_raw(&["edit", "--all", "--template", r#"{"lanes":2}"#]);
    assert!(!ok);
    assert_eq!(body["error"]["code"], "invalid_request");
    assert!(body["message"].as_str().expect("message").contains("lanes"));
}

#[test]
fn missing_lab_snapshot_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = fct()
        .env_remove("FCT_CONFIG")
        .arg("resolve")
        .arg("DEN-1")
        .output()
        .expect("run");
    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(body["error"]["code"], "invalid_request");

    let output = fct()
        .env_remove("FCT_CONFIG")
        .arg("--lab")
        .arg(dir.path().join("absent.json"))
        .arg("resolve")
        .arg("DEN-1")
        .output()
        .expect("run");
    let body: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(body["error"]["code"], "not_found");
}

#[test]
fn raw_requests_carry_their_own_paths() {
    let ws = Workspace::new();
    let request = serde_json::json!({
        "action": "resolve",
        "payload": {"input": "DEN-2"},
        "options": {"lab": ws.path("lab.json")}
    })
    .to_string();

    let output = fct()
        .env_remove("FCT_CONFIG")
        .arg("command")
        .arg("--json")
        .arg(&request)
        .output()
        .expect("run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(body["data"]["assignments"][0]["lcset"], "LCSET-7");
}

#[test]
fn requests_can_come_from_stdin() {
    fct()
        .env_remove("FCT_CONFIG")
        .arg("command")
        .write_stdin(r#"{"action":"capabilities"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"start_route\""));
}

#[test]
fn capabilities_can_include_schemas() {
    let output = fct()
        .env_remove("FCT_CONFIG")
        .args(["capabilities", "--schemas"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(body["data"]["server"]["name"], "fct");
    assert_eq!(
        body["data"]["actions"].as_array().expect("actions").len(),
        6
    );
    assert!(body["data"]["schemas"]["request"].is_object());
}

#[test]
fn config_window_excludes_old_tubes() {
    let ws = Workspace::new();
    let config = write(ws.dir.path(), "fct.toml", "[designation]\nwindow_days = 3\n");

    let body = ws.run(&[
        "--config",
        config.to_str().expect("utf8 path"),
        "build",
        "DEN-1 DEN-2",
        "--now",
        NOW,
    ]);
    assert!(body["data"]["records"].as_array().expect("records").is_empty());
    let warnings: Vec<&str> = body["data"]["warnings"]
        .as_array()
        .expect("warnings")
        .iter()
        .map(|w| w.as_str().expect("warning"))
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].starts_with("Excluded DEN-1"));
    assert!(body["meta"]["config_path"]
        .as_str()
        .expect("config path")
        .ends_with("fct.toml"));
}

#[test]
fn invalid_config_stops_the_run() {
    let ws = Workspace::new();
    let config = write(ws.dir.path(), "fct.toml", "[cache]\nbatch_capacity = 0\n");
    fct()
        .arg("--config")
        .arg(&config)
        .arg("capabilities")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cache.batch_capacity"));
}
