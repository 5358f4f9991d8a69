#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("cli.dat");
    let pd = dir.path().join("cli.pd");
    (dir, data, pd)
}

fn pagestore(data: &Path, pd: &Path, org: &str) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pagestore");
    cmd.arg("--data")
        .arg(data)
        .arg("--directory")
        .arg(pd)
        .args(["--org", org])
        .env_remove("PAGESTORE_SYNC");
    cmd
}

fn stdout(cmd: &mut assert_cmd::Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf8 stdout")
}

fn json(cmd: &mut assert_cmd::Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("valid json")
}

#[test]
fn insert_then_search_roundtrips_payload() {
    let (_dir, data, pd) = setup();
    let out = stdout(pagestore(&data, &pd, "heap").args(["insert", "7", "seven"]));
    assert!(out.contains("inserted key 7"), "{out}");

    let found = json(pagestore(&data, &pd, "heap").args(["--format", "json", "search", "7"]));
    assert_eq!(found["record"]["key"], 7);
    assert_eq!(found["record"]["data"], "seven");

    let missing = json(pagestore(&data, &pd, "heap").args(["--format", "json", "search", "8"]));
    assert!(missing["record"].is_null());
}

#[test]
fn sorted_range_and_dump() {
    let (_dir, data, pd) = setup();
    for key in ["30", "10", "20", "-5"] {
        pagestore(&data, &pd, "sorted")
            .args(["insert", key, "payload"])
            .assert()
            .success();
    }

    let range = json(pagestore(&data, &pd, "sorted").args([
        "--format", "json", "range", "-10", "20",
    ]));
    let keys: Vec<i64> = range["records"]
        .as_array()
        .expect("records array")
        .iter()
        .filter_map(|record| record["key"].as_i64())
        .collect();
    assert_eq!(keys, vec![-5, 10, 20]);

    let dump = stdout(pagestore(&data, &pd, "sorted").arg("dump"));
    assert!(dump.starts_with("Page 0: -5,10,20,30,X"), "{dump}");
}

#[test]
fn delete_reports_outcome() {
    let (_dir, data, pd) = setup();
    pagestore(&data, &pd, "heap")
        .args(["insert", "1", "one"])
        .assert()
        .success();

    let deleted = json(pagestore(&data, &pd, "heap").args(["--format", "json", "delete", "1"]));
    assert_eq!(deleted["deleted"], true);

    let out = stdout(pagestore(&data, &pd, "heap").args(["delete", "1"]));
    assert!(out.contains("key 1 not found"), "{out}");
}

#[test]
fn stats_reports_pages_and_io() {
    let (_dir, data, pd) = setup();
    pagestore(&data, &pd, "heap")
        .args(["insert", "1", "one"])
        .assert()
        .success();

    let stats = json(pagestore(&data, &pd, "heap").args(["--format", "json", "stats"]));
    assert_eq!(stats["organization"], "heap");
    assert_eq!(stats["pages"], 1);
    assert_eq!(stats["directory_reads"], 1);
    assert_eq!(stats["page_writes"], 0);
}

#[test]
fn corrupt_directory_fails_with_message() {
    let (_dir, data, pd) = setup();
    std::fs::write(&pd, b"not a directory").expect("write junk");
    let output = pagestore(&data, &pd, "heap")
        .arg("dump")
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&output);
    assert!(stderr.contains("corruption"), "{stderr}");
}
