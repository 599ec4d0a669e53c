// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for task locking

use super::*;
use tempfile::TempDir;

#[test]
fn acquire_writes_pid_sentinel() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    let lock = store.acquire_task_lock(dir.path(), false).unwrap();
    let info: LockInfo = serde_json::from_slice(&std::fs::read(lock.path()).unwrap()).unwrap();
    assert_eq!(info.pid, std::process::id());
    assert!(!info.acquired_at.is_empty());
}

#[test]
fn second_acquire_fails_while_held() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    let _held = store.acquire_task_lock(dir.path(), false).unwrap();
    let err = store.acquire_task_lock(dir.path(), false).unwrap_err();
    match err {
        StoreError::LockHeld { pid, .. } => assert_eq!(pid, std::process::id()),
        other => panic!("expected LockHeld, got {other:?}"),
    }
}

#[test]
fn force_does_not_steal_live_lock() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    let _held = store.acquire_task_lock(dir.path(), false).unwrap();
    assert!(matches!(
        store.acquire_task_lock(dir.path(), true),
        Err(StoreError::LockHeld { .. })
    ));
}

#[test]
fn release_allows_reacquire() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    let lock = store.acquire_task_lock(dir.path(), false).unwrap();
    lock.release();
    store.acquire_task_lock(dir.path(), false).unwrap();
}

#[test]
fn drop_releases_the_flock() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path());
    {
        let _lock = store.acquire_task_lock(dir.path(), false).unwrap();
    }
    store.acquire_task_lock(dir.path(), false).unwrap();
}
