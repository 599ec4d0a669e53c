// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for stage requirement enforcement

use super::*;
use crate::evidence::VerifyResult;

fn done(plan_md: Option<&str>) -> Decision {
    normalize_decision(DecisionPayload {
        decision: Some("done".to_string()),
        explanation: Some("looks complete".to_string()),
        plan_md: plan_md.map(str::to_string),
        ..Default::default()
    })
}

fn passing_evidence() -> Evidence {
    Evidence {
        results: vec![VerifyResult {
            id: "cargo-test".to_string(),
            label: "cargo test".to_string(),
            cmd: "cargo".to_string(),
            args: vec!["test".to_string()],
            cwd: std::path::PathBuf::from("."),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 10,
            error: None,
        }],
        ..Default::default()
    }
}

#[test]
fn planning_done_without_plan_is_downgraded() {
    let enforced =
        enforce_stage_requirement(TaskStage::Planning, done(None), &Evidence::default());
    assert_eq!(enforced.decision, DecisionKind::NotDone);
    assert!(!enforced.explanation.is_empty());
    assert!(enforced.next_prompt.is_some());
}

#[test]
fn planning_done_with_plan_passes() {
    let enforced =
        enforce_stage_requirement(TaskStage::Planning, done(Some("# Plan")), &Evidence::default());
    assert_eq!(enforced.decision, DecisionKind::Done);
}

#[test]
fn execution_done_needs_a_passing_check() {
    let downgraded =
        enforce_stage_requirement(TaskStage::Execution, done(None), &Evidence::default());
    assert_eq!(downgraded.decision, DecisionKind::NotDone);

    let passed = enforce_stage_requirement(TaskStage::Execution, done(None), &passing_evidence());
    assert_eq!(passed.decision, DecisionKind::Done);
}

#[test]
fn execution_done_accepts_changes_when_nothing_is_detectable() {
    let evidence = Evidence {
        git_diff_stat: "src/main.rs | 4 ++--".to_string(),
        ..Default::default()
    };
    let enforced = enforce_stage_requirement(TaskStage::Execution, done(None), &evidence);
    assert_eq!(enforced.decision, DecisionKind::Done);
}

#[test]
fn non_done_decisions_pass_through() {
    let blocked = normalize_decision(DecisionPayload {
        decision: Some("blocked".to_string()),
        ..Default::default()
    });
    let enforced =
        enforce_stage_requirement(TaskStage::Execution, blocked.clone(), &Evidence::default());
    assert_eq!(enforced, blocked);
}
