// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for local verification evidence

use super::*;
use tempfile::TempDir;

#[test]
fn empty_tree_detects_nothing() {
    let dir = TempDir::new().unwrap();
    assert!(detect_verify_commands(dir.path()).is_empty());
}

#[test]
fn cargo_tree_detects_check_and_test_in_order() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
    let commands = detect_verify_commands(dir.path());
    let ids: Vec<&str> = commands.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["cargo-check", "cargo-test"]);
}

#[test]
fn npm_scripts_gate_detection() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("package.json"),
        r#"{"scripts":{"test":"jest","format":"prettier"}}"#,
    )
    .unwrap();
    let commands = detect_verify_commands(dir.path());
    let ids: Vec<&str> = commands.iter().map(|c| c.id.as_str()).collect();
    // Only scripts that exist; lint and build are absent.
    assert_eq!(ids, vec!["npm-test"]);
}

#[test]
fn makefile_requires_a_test_target() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Makefile"), "build:\n\tcc main.c\n").unwrap();
    assert!(detect_verify_commands(dir.path()).is_empty());

    std::fs::write(dir.path().join("Makefile"), "test:\n\t./run-tests\n").unwrap();
    let commands = detect_verify_commands(dir.path());
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].id, "make-test");
}

#[test]
fn detection_is_deterministic() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
    std::fs::write(dir.path().join("go.mod"), "module x\n").unwrap();
    let first = detect_verify_commands(dir.path());
    let second = detect_verify_commands(dir.path());
    assert_eq!(first, second);
    let ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["cargo-check", "cargo-test", "go-vet", "go-test"]);
}

#[tokio::test]
async fn collect_evidence_runs_commands_and_caps_output() {
    let dir = TempDir::new().unwrap();
    // A Makefile test target that produces output and succeeds.
    std::fs::write(dir.path().join("Makefile"), "test:\n\t@echo verification ok\n").unwrap();
    let evidence = collect_evidence(dir.path()).await;
    assert_eq!(evidence.results.len(), 1);
    let result = &evidence.results[0];
    if result.error.is_none() {
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("verification ok"));
        assert!(evidence.any_check_passed());
    }
    // Not a git repository: summaries are empty, not errors.
    assert!(evidence.git_status.is_empty());
    assert!(evidence.git_diff_stat.is_empty());
}

#[tokio::test]
async fn missing_binaries_surface_as_errors_not_panics() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
    let evidence = collect_evidence(dir.path()).await;
    assert_eq!(evidence.results.len(), 1);
    // tsc is unlikely to exist in the test environment; either way the
    // result records an outcome instead of failing the collection.
    let result = &evidence.results[0];
    assert!(result.error.is_some() || result.exit_code != i32::MIN);
}

#[test]
fn capture_cap_is_enforced() {
    let big = "x".repeat(CAPTURE_MAX_CHARS + 500);
    let capped = cap_capture(big.as_bytes());
    assert_eq!(capped.chars().count(), CAPTURE_MAX_CHARS);
}
