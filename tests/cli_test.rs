// Tests for the designmap binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scenario/pkg")
}

fn designmap(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("designmap").unwrap();
    cmd.current_dir(cwd.path());
    cmd
}

#[test]
fn test_generate_prints_summary() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("docs");

    designmap(&work)
        .arg("generate")
        .arg(fixture_root())
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Discovered 2 files, analyzed 2"))
        .stdout(predicate::str::contains("Found 3 classes"))
        .stdout(predicate::str::contains("Wrote 3 artifacts"));

    assert!(out.join("overview.md").is_file());
    assert!(out.join("pkg/sub/module.md").is_file());
}

#[test]
fn test_generate_json_summary() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("docs");

    let output = designmap(&work)
        .args(["generate", "--json", "--diagram", "component_tree", "--output"])
        .arg(&out)
        .arg(fixture_root())
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["classes_found"], 3);
    assert_eq!(summary["diagram_kinds"], serde_json::json!(["component_tree"]));
    assert_eq!(summary["warnings"].as_array().unwrap().len(), 0);
}

#[test]
fn test_config_writes_nothing() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("docs");

    designmap(&work)
        .arg("config")
        .arg(fixture_root())
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("class_graph"))
        .stdout(predicate::str::contains("javascript"))
        .stdout(predicate::str::contains("python"));

    assert!(!out.exists());
}

#[test]
fn test_config_file_is_picked_up() {
    let work = TempDir::new().unwrap();
    std::fs::write(
        work.path().join("designmap.toml"),
        "[diagrams]\nkinds = [\"component_tree\"]\ndirection = \"LR\"\n",
    )
    .unwrap();

    designmap(&work)
        .args(["config", "--json"])
        .arg(fixture_root())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"component_tree\""))
        .stdout(predicate::str::contains("\"LR\""))
        .stdout(predicate::str::contains("class_graph").not());
}

#[test]
fn test_missing_root_fails() {
    let work = TempDir::new().unwrap();

    designmap(&work)
        .args(["generate", "does-not-exist"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Path not found"));
}

#[test]
fn test_unknown_language_rejected() {
    let work = TempDir::new().unwrap();

    designmap(&work)
        .args(["generate", "--language", "cobol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown language"));
}

#[test]
fn test_warnings_listed_on_request() {
    let work = TempDir::new().unwrap();
    let src = work.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("broken.ts"), "class Broken {\n  run() {\n").unwrap();

    designmap(&work)
        .args(["generate", "src", "--output", "docs", "--show-warnings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Warnings (1):"))
        .stdout(predicate::str::contains("broken.ts:1: [parse]"));
}
