// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for run records

use super::*;

#[test]
fn continue_serializes_as_keyword_string() {
    assert_eq!(serde_json::to_string(&RunStatus::Continue).unwrap(), "\"continue\"");
    let back: RunStatus = serde_json::from_str("\"continue\"").unwrap();
    assert_eq!(back, RunStatus::Continue);
}

#[test]
fn running_is_the_only_non_terminal_status() {
    assert!(!RunStatus::Running.is_terminal());
    for status in [RunStatus::Done, RunStatus::Continue, RunStatus::Failed, RunStatus::Blocked] {
        assert!(status.is_terminal(), "{status} should be terminal");
    }
}

#[test]
fn meta_round_trips_without_optionals() {
    let meta = RunMeta {
        run_id: RunId::from_string("run-abc"),
        stage: RunStage::Execute,
        engine: "claude".into(),
        model: None,
        created_at: "2020-01-01T00:00:00.000Z".into(),
        status: RunStatus::Running,
        reason: None,
        finalized_at: None,
        recovered_from: None,
    };
    let json = serde_json::to_string(&meta).unwrap();
    assert!(!json.contains("reason"));
    let back: RunMeta = serde_json::from_str(&json).unwrap();
    assert!(!back.is_finalized());
}
