// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the orphan sweep

use super::*;
use tempfile::TempDir;

#[test]
fn dead_pids_are_reaped_and_live_ones_kept() {
    let dir = TempDir::new().unwrap();
    let manager = ProcessManager::new(dir.path());

    // Our own pid is alive; an exited child's pid is not.
    manager.register(std::process::id(), "live", "2020-01-01T00:00:00.000Z");
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();
    manager.register(dead_pid, "dead", "2020-01-01T00:00:00.000Z");

    let reaped = sweep_once(dir.path());
    assert_eq!(reaped, vec![dead_pid]);

    let remaining = ProcessManager::read_heartbeats(dir.path());
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].pid, std::process::id());
}

#[test]
fn empty_procs_dir_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    assert!(sweep_once(dir.path()).is_empty());
}
