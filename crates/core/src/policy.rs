// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage-to-status alignment policy.
//!
//! Applied after every stage completion to repair drift between the remote
//! task's `stage` and `status` fields.

use crate::decision::DecisionKind;
use crate::task::{TaskStage, TaskStatus};
use serde::{Deserialize, Serialize};

/// Partial task patch aligning status with a completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<TaskStage>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

fn is_known_working_stage(stage: &str) -> bool {
    matches!(stage, "ideation" | "planning" | "execution" | "verification")
}

/// Compute the terminal patch for a task after a stage completion.
///
/// `new_stage` is the stage string reported by the completion endpoint and
/// is not guaranteed to name a known stage. Pure function of its inputs:
///
/// - `new_stage == "done"` → completed, regardless of decision
/// - decision `failed` → failed
/// - decision `blocked` → blocked
/// - decision `done` while `new_stage` names a known working stage →
///   `None` (the stage machine owns the transition)
/// - decision `done` with an unrecognized `new_stage` → completed, with
///   `stage` forced to `done` (status=completed implies stage=done)
/// - otherwise → `None`
pub fn build_cloud_task_terminal_patch(
    decision: DecisionKind,
    new_stage: &str,
    now_iso: &str,
) -> Option<TerminalPatch> {
    if new_stage == "done" {
        return Some(completed(now_iso));
    }
    match decision {
        DecisionKind::Failed => Some(TerminalPatch {
            stage: None,
            status: TaskStatus::Failed,
            completed_at: Some(now_iso.to_string()),
        }),
        DecisionKind::Blocked => Some(TerminalPatch {
            stage: None,
            status: TaskStatus::Blocked,
            completed_at: None,
        }),
        DecisionKind::Done if is_known_working_stage(new_stage) => None,
        DecisionKind::Done => Some(completed(now_iso)),
        DecisionKind::NotDone => None,
    }
}

fn completed(now_iso: &str) -> TerminalPatch {
    TerminalPatch {
        stage: Some(TaskStage::Done),
        status: TaskStatus::Completed,
        completed_at: Some(now_iso.to_string()),
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
