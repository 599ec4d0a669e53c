// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for run index entries

use super::*;
use crate::run::CreateRun;
use crate::ArtifactStore;
use agx_core::{RunStage, RunStatus};
use tempfile::TempDir;

const NOW: &str = "2020-01-01T00:00:00.000Z";

fn run_with_files() -> (TempDir, crate::RunHandle) {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    let mut run = store
        .create_run(
            CreateRun {
                project_slug: "proj".to_string(),
                task_slug: "task".to_string(),
                stage: RunStage::Execute,
                run_id: None,
                engine: "claude".to_string(),
                model: Some("opus".to_string()),
            },
            NOW,
        )
        .unwrap();
    run.write_prompt("a prompt", "execute", NOW).unwrap();
    run.write_output("some output").unwrap();
    run.write_artifact("nested/impl.md", b"summary").unwrap();
    run.finalize(RunStatus::Done, "complete", NOW).unwrap();
    (dir, run)
}

#[test]
fn manifest_covers_all_run_files() {
    let (_dir, run) = run_with_files();
    let entry = build_run_index_entry(&run, 5 * 1024 * 1024).unwrap();

    assert_eq!(entry.status, RunStatus::Done);
    assert_eq!(entry.engine, "claude");
    let kinds: Vec<_> = entry.artifact_manifest.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&agx_core::ManifestKind::Prompt));
    assert!(kinds.contains(&agx_core::ManifestKind::Output));
    assert!(kinds.contains(&agx_core::ManifestKind::Events));
    assert!(kinds.contains(&agx_core::ManifestKind::Artifact));
    // Nested artifact was walked.
    assert!(entry.artifact_manifest.iter().any(|e| e.key.ends_with("nested/impl.md")));
}

#[test]
fn keys_are_local_uris() {
    let (_dir, run) = run_with_files();
    let entry = build_run_index_entry(&run, 5 * 1024 * 1024).unwrap();
    for item in &entry.artifact_manifest {
        assert!(item.key.starts_with("local://"), "bad key {}", item.key);
    }
}

#[test]
fn sha_omitted_above_ceiling() {
    let (_dir, run) = run_with_files();
    // Ceiling of zero: everything is "too large" except empty files.
    let entry = build_run_index_entry(&run, 0).unwrap();
    let output = entry
        .artifact_manifest
        .iter()
        .find(|e| e.key.ends_with("output.md"))
        .unwrap();
    assert!(output.sha256.is_none());

    let entry = build_run_index_entry(&run, 5 * 1024 * 1024).unwrap();
    let output = entry
        .artifact_manifest
        .iter()
        .find(|e| e.key.ends_with("output.md"))
        .unwrap();
    let sha = output.sha256.as_deref().unwrap();
    assert_eq!(sha.len(), 64);
}
