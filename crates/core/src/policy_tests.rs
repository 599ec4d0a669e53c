// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the stage-to-status policy

use super::*;
use yare::parameterized;

const NOW: &str = "2020-01-01T00:00:00.000Z";

#[test]
fn done_decision_on_unknown_stage_completes() {
    let patch = build_cloud_task_terminal_patch(DecisionKind::Done, "progress", NOW)
        .expect("expected a patch");
    assert_eq!(patch.stage, Some(TaskStage::Done));
    assert_eq!(patch.status, TaskStatus::Completed);
    assert_eq!(patch.completed_at.as_deref(), Some(NOW));
}

#[test]
fn not_done_on_working_stage_passes_through() {
    assert_eq!(build_cloud_task_terminal_patch(DecisionKind::NotDone, "execution", NOW), None);
}

#[parameterized(
    done = { DecisionKind::Done },
    blocked = { DecisionKind::Blocked },
    not_done = { DecisionKind::NotDone },
    failed = { DecisionKind::Failed },
)]
fn done_stage_completes_regardless_of_decision(decision: DecisionKind) {
    let patch = build_cloud_task_terminal_patch(decision, "done", NOW).expect("expected a patch");
    assert_eq!(patch.status, TaskStatus::Completed);
    assert_eq!(patch.stage, Some(TaskStage::Done));
}

#[parameterized(
    ideation = { "ideation" },
    planning = { "planning" },
    execution = { "execution" },
    verification = { "verification" },
)]
fn failed_decision_fails_on_any_working_stage(stage: &str) {
    let patch = build_cloud_task_terminal_patch(DecisionKind::Failed, stage, NOW)
        .expect("expected a patch");
    assert_eq!(patch.status, TaskStatus::Failed);
    assert_eq!(patch.stage, None);
    assert_eq!(patch.completed_at.as_deref(), Some(NOW));
}

#[test]
fn blocked_decision_blocks_without_completion_timestamp() {
    let patch = build_cloud_task_terminal_patch(DecisionKind::Blocked, "planning", NOW)
        .expect("expected a patch");
    assert_eq!(patch.status, TaskStatus::Blocked);
    assert_eq!(patch.completed_at, None);
}

#[test]
fn done_decision_on_working_stage_defers_to_stage_machine() {
    for stage in ["ideation", "planning", "execution", "verification"] {
        assert_eq!(build_cloud_task_terminal_patch(DecisionKind::Done, stage, NOW), None);
    }
}

// Exhaustive enumeration: the function is total and pure over its domain.
#[test]
fn exhaustive_table() {
    let decisions = [
        DecisionKind::Done,
        DecisionKind::Blocked,
        DecisionKind::NotDone,
        DecisionKind::Failed,
    ];
    let stages = ["ideation", "planning", "execution", "verification", "done", "progress"];
    for decision in decisions {
        for stage in stages {
            let a = build_cloud_task_terminal_patch(decision, stage, NOW);
            let b = build_cloud_task_terminal_patch(decision, stage, NOW);
            assert_eq!(a, b, "not pure for {decision}/{stage}");
        }
    }
}
