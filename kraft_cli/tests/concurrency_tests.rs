//! Concurrency tests for the kraft binary.
//!
//! These tests verify that multiple processes can safely write to the same
//! database (file locking plus atomic replace).

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
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

fn read_db(dir: &Path) -> serde_json::Value {
    let contents =
        std::fs::read_to_string(dir.join("data/kraft.json")).expect("Failed to read database");
    serde_json::from_str(&contents).expect("Database is not valid JSON")
}

#[test]
fn test_parallel_adds_keep_every_entry() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["add", &format!("Exercise {}", i), "--weight", "10"])
                    .assert()
                    .success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Worker thread panicked");
    }

    let db = read_db(&dir);
    let exercises = db["exercises"].as_array().unwrap();
    assert_eq!(exercises.len(), 8, "Expected 8 entries, got {}", exercises.len());

    let mut ids: Vec<_> = exercises.iter().map(|e| e["id"].as_u64().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());

    let mut orders: Vec<_> = exercises.iter().map(|e| e["order"].as_i64().unwrap()).collect();
    orders.sort_unstable();
    assert_eq!(orders, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_parallel_training_updates() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    for i in 0..4 {
        cli(&dir)
            .args(["add", &format!("Exercise {}", i)])
            .assert()
            .success();
    }
    cli(&dir).arg("start").assert().success();

    let handles: Vec<_> = (1..=4)
        .map(|id| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["done", &id.to_string(), "--weight", "25"])
                    .assert()
                    .success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Worker thread panicked");
    }

    let db = read_db(&dir);
    let entries = db["training"]["current"]["entries"].as_array().unwrap();
    assert!(entries.iter().all(|e| e["completed"] == true));
    assert!(db["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["weight"] == 25.0));
}
