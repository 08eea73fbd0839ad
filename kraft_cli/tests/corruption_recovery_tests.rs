//! Corruption recovery tests for the kraft binary.
//!
//! These tests verify the system can handle:
//! - Corrupted database files
//! - Databases written by older versions (missing order fields)
//! - Missing files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kraft").expect("Failed to find kraft binary");
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_database_is_not_replaced() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("kraft.json"), "{ invalid json }}}}").unwrap();

    cli(temp_dir.path())
        .args(["add", "Squat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Storage unavailable"));

    let contents = fs::read_to_string(data_dir.join("kraft.json")).unwrap();
    assert_eq!(contents, "{ invalid json }}}}");
}

#[test]
fn test_foreign_document_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("kraft.json"), r#"{"name":"SomethingElse","version":1}"#).unwrap();

    cli(temp_dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a training database"));
}

#[test]
fn test_missing_orders_repaired_on_startup() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("kraft.json"),
        r#"{"name":"KrafttrainingDB","version":1,"exercises":[
            {"id":1,"name":"Squat","weight":40},
            {"id":2,"name":"Bench","weight":60}
        ]}"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Squat  40 kg"))
        .stdout(predicate::str::contains("Bench  60 kg"));

    let contents = fs::read_to_string(data_dir.join("kraft.json")).unwrap();
    let db: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(db["exercises"][0]["order"], 0);
    assert_eq!(db["exercises"][1]["order"], 1);
    assert_eq!(db["next_id"], 2);

    // Moving works on the repaired orders
    cli(temp_dir.path()).args(["move", "2", "up"]).assert().success();
    let out = cli(temp_dir.path()).arg("list").assert().success().get_output().stdout.clone();
    let out = String::from_utf8(out).unwrap();
    assert!(out.find("Bench").unwrap() < out.find("Squat").unwrap());
}

#[test]
fn test_missing_import_file() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["import", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_config_reported() {
    let temp_dir = setup_test_dir();
    let config_dir = temp_dir.path().join("config/kraft");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[plates\nbroken").unwrap();

    cli(temp_dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML error"));
}
