//! Integration tests for the `huestatus` binary.
//!
//! Every test points `--store` at a fresh temp dir, so nothing touches the
//! user's configuration. Commands that would reach a bridge are only run on
//! configurations where no request is needed.

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};

fn cli(store: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("huestatus");
    cmd.arg("--store").arg(store);
    cmd
}

fn store_in(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("store.json")
}

fn lab_document() -> Value {
    json!({
        "version": 1,
        "bridges": [{
            "name": "lab",
            "address": "10.0.0.5",
            "user": "abc",
            "groups": [{"name": "rack1", "status": {"HEALTH_ERR": {"color": "red", "type": "alert"}}}]
        }]
    })
}

fn write_json(dir: &tempfile::TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).unwrap();
    path
}

fn config_json(store: &Path) -> Value {
    let output = cli(store)
        .args(["config", "get"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("config get should print JSON")
}

// ── basics ──

#[test]
fn cli_help_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    cli(&store_in(&dir))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("huestatus"));
}

#[test]
fn cli_version_prints_version() {
    let dir = tempfile::tempdir().unwrap();
    cli(&store_in(&dir))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_verbose_flag_accepted() {
    let dir = tempfile::tempdir().unwrap();
    cli(&store_in(&dir))
        .args(["-v", "config", "get"])
        .assert()
        .success();
}

// ── config ──

#[test]
fn config_get_on_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_json(&store_in(&dir));
    assert_eq!(config["bridges"], json!([]));
    assert_eq!(config["version"], 1);
    assert_eq!(config["format"], "huestatus");
}

#[test]
fn config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = write_json(&dir, "doc.json", &lab_document());

    cli(&store)
        .args(["config", "set"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 bridges"));

    let config = config_json(&store);
    assert_eq!(config["bridges"][0]["name"], "lab");
    assert_eq!(
        config["bridges"][0]["groups"][0]["status"]["HEALTH_ERR"],
        json!({"color": "red", "type": "alert"})
    );
    assert!(store.exists());
}

#[test]
fn config_set_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    cli(&store)
        .args(["config", "set", "-"])
        .write_stdin(lab_document().to_string())
        .assert()
        .success();
    assert_eq!(config_json(&store)["bridges"][0]["address"], "10.0.0.5");
}

#[test]
fn config_set_invalid_keeps_previous() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let good = write_json(&dir, "good.json", &lab_document());
    let bad = write_json(
        &dir,
        "bad.json",
        &json!({"bridges": [{"name": "x", "groups": [
            {"name": "g", "status": {"S": {"color": "chartreuse"}}}
        ]}]}),
    );

    cli(&store).args(["config", "set"]).arg(&good).assert().success();
    cli(&store)
        .args(["config", "set"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config error").and(predicate::str::contains("chartreuse")));

    assert_eq!(config_json(&store)["bridges"][0]["name"], "lab");
}

// ── bridge ──

#[test]
fn bridge_setup_and_ls() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    cli(&store)
        .args(["bridge", "setup", "office", "-"])
        .write_stdin(r#"{"address": "10.0.0.6"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("office"));

    cli(&store)
        .args(["bridge", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("office").and(predicate::str::contains("10.0.0.6")));

    let output = cli(&store)
        .args(["--json", "bridge", "ls"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let list: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(
        list,
        json!([{"name": "office", "address": "10.0.0.6", "paired": false, "enabled": false, "groups": 0}])
    );
}

#[test]
fn bridge_set_user_and_address() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    cli(&store)
        .args(["bridge", "setup", "lab", "-"])
        .write_stdin("{}")
        .assert()
        .success();
    cli(&store)
        .args(["bridge", "set-address", "lab", "10.0.0.9"])
        .assert()
        .success();
    cli(&store)
        .args(["bridge", "set-user", "lab", "token"])
        .assert()
        .success();

    let config = config_json(&store);
    assert_eq!(config["bridges"][0]["address"], "10.0.0.9");
    assert_eq!(config["bridges"][0]["user"], "token");
}

#[test]
fn unknown_bridge_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    for args in [
        vec!["bridge", "enable", "nope"],
        vec!["bridge", "disable", "nope"],
        vec!["bridge", "set-user", "nope", "u"],
        vec!["bridge", "info", "nope"],
    ] {
        cli(&store)
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not found: bridge 'nope'"));
    }
}

#[test]
fn enable_without_user_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    cli(&store)
        .args(["bridge", "setup", "office", "-"])
        .write_stdin(r#"{"address": "10.0.0.6"}"#)
        .assert()
        .success();

    let output = cli(&store)
        .args(["--json", "bridge", "enable", "office", "--force"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(out, json!({"bridge": "office", "enabled": false}));
    assert_eq!(config_json(&store)["bridges"][0]["enabled"], false);
}

#[test]
fn forced_enable_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = write_json(&dir, "doc.json", &lab_document());
    cli(&store).args(["config", "set"]).arg(&doc).assert().success();

    cli(&store)
        .args(["bridge", "enable", "lab", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled"));
    assert_eq!(config_json(&store)["bridges"][0]["enabled"], true);
}

#[test]
fn bridge_info_lists_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = write_json(&dir, "doc.json", &lab_document());
    cli(&store).args(["config", "set"]).arg(&doc).assert().success();

    cli(&store)
        .args(["bridge", "info", "lab"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("10.0.0.5")
                .and(predicate::str::contains("rack1"))
                .and(predicate::str::contains("red (alert)")),
        );
}

// ── apply / watch ──

#[test]
fn apply_without_enabled_bridges() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = write_json(&dir, "doc.json", &lab_document());
    cli(&store).args(["config", "set"]).arg(&doc).assert().success();

    cli(&store)
        .args(["apply", "HEALTH_ERR"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no group handles"));

    let output = cli(&store)
        .args(["--json", "apply", "HEALTH_ERR"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report, json!({"status": "HEALTH_ERR", "groups": []}));
}

#[test]
fn watch_reads_until_eof() {
    let dir = tempfile::tempdir().unwrap();
    cli(&store_in(&dir))
        .arg("watch")
        .write_stdin("HEALTH_OK\n\nHEALTH_WARN\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("HEALTH_OK: no group handles")
                .and(predicate::str::contains("HEALTH_WARN: no group handles"))
                .and(predicate::str::contains("Shutting down")),
        );
}
