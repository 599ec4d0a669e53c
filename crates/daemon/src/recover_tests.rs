// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for startup recovery

use super::*;
use agx_core::{RunStage, RunStatus};
use agx_store::CreateRun;
use tempfile::TempDir;

const NOW: &str = "2020-01-01T00:00:00.000Z";

fn abandoned_run(store: &ArtifactStore, task_slug: &str) {
    store
        .create_run(
            CreateRun {
                project_slug: "proj".to_string(),
                task_slug: task_slug.to_string(),
                stage: RunStage::Execute,
                run_id: None,
                engine: "claude".to_string(),
                model: None,
            },
            NOW,
        )
        .unwrap();
    // Dropped without finalize: simulates a daemon crash.
}

#[test]
fn abandoned_runs_gain_resume_records() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    abandoned_run(&store, "task-a");
    abandoned_run(&store, "task-b");

    let recovered = recover_incomplete_runs(&store, NOW);
    assert_eq!(recovered, 2);

    for task in ["task-a", "task-b"] {
        let incomplete = store.find_incomplete_runs("proj", task).unwrap();
        // Only the fresh resume run remains open.
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].stage, RunStage::Resume);
        assert!(incomplete[0].meta.recovered_from.is_some());
    }
}

#[test]
fn second_restart_closes_dangling_resume_runs() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    abandoned_run(&store, "task-a");

    recover_incomplete_runs(&store, NOW);
    // Second restart: the resume run is closed, not chained.
    let recovered = recover_incomplete_runs(&store, NOW);
    assert_eq!(recovered, 1);
    assert!(store.find_incomplete_runs("proj", "task-a").unwrap().is_empty());

    let runs_dir = store.runs_dir("proj", "task-a");
    let containers = std::fs::read_dir(runs_dir).unwrap().count();
    // One abandoned execute container plus one resume container.
    assert_eq!(containers, 2);
}

#[test]
fn finalized_runs_are_untouched() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    let mut run = store
        .create_run(
            CreateRun {
                project_slug: "proj".to_string(),
                task_slug: "task-a".to_string(),
                stage: RunStage::Execute,
                run_id: None,
                engine: "claude".to_string(),
                model: None,
            },
            NOW,
        )
        .unwrap();
    run.finalize(RunStatus::Done, "complete", NOW).unwrap();

    assert_eq!(recover_incomplete_runs(&store, NOW), 0);
}
