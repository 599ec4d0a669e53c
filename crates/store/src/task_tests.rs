// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for task mirrors

use super::*;
use tempfile::TempDir;

const NOW: &str = "2020-01-01T00:00:00.000Z";

fn store() -> (TempDir, ArtifactStore) {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    (dir, store)
}

fn create(store: &ArtifactStore) -> TaskState {
    store
        .create_task(
            "proj",
            CreateTask {
                user_request: "Fix the login flow".to_string(),
                goal: "Users can log in".to_string(),
                task_slug: "fix-login".to_string(),
            },
            NOW,
        )
        .unwrap()
}

#[test]
fn create_task_materializes_skeleton() {
    let (_dir, store) = store();
    let state = create(&store);
    assert_eq!(state.slug, "fix-login");
    assert!(store.task_dir("proj", "fix-login").join("state.json").is_file());
    assert!(store.runs_dir("proj", "fix-login").is_dir());
}

#[test]
fn update_merges_and_preserves() {
    let (_dir, store) = store();
    create(&store);
    let partial = [("status".to_string(), serde_json::json!("running"))].into_iter().collect();
    let merged = store.update_task_state("proj", "fix-login", &partial).unwrap();
    assert_eq!(merged.status.as_deref(), Some("running"));
    assert_eq!(merged.goal.as_deref(), Some("Users can log in"));
}

#[test]
fn unknown_fields_survive_update() {
    let (_dir, store) = store();
    create(&store);
    let partial = [("custom_marker".to_string(), serde_json::json!(7))].into_iter().collect();
    store.update_task_state("proj", "fix-login", &partial).unwrap();
    let state = store.read_task_state("proj", "fix-login").unwrap().unwrap();
    assert_eq!(state.extra.get("custom_marker"), Some(&serde_json::json!(7)));
}

#[test]
fn working_set_renders_cloud_fields() {
    let (_dir, store) = store();
    create(&store);
    let task: agx_core::Task = serde_json::from_value(serde_json::json!({
        "id": "t1",
        "slug": "fix-login",
        "title": "Fix login",
        "content": "Body text",
        "stage": "execution",
        "status": "in_progress",
        "provider": "claude"
    }))
    .unwrap();
    store.write_working_set("proj", "fix-login", &task).unwrap();
    let md =
        std::fs::read_to_string(store.task_dir("proj", "fix-login").join("working_set.md"))
            .unwrap();
    assert!(md.starts_with("# Fix login"));
    assert!(md.contains("stage: execution"));
    assert!(md.contains("provider: claude"));
    assert!(md.contains("Body text"));
}
