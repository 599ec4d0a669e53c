// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for run trace events

use super::*;
use crate::run::RunStatus;

#[test]
fn events_tag_with_scoped_type() {
    let event = RunEvent::ProviderStart {
        pid: Some(42),
        args: vec!["claude".to_string()],
        timeout_ms: 1000,
        started_at: "2020-01-01T00:00:00.000Z".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "provider:start");
    assert_eq!(json["pid"], 42);
}

#[test]
fn unknown_type_deserializes_to_custom() {
    let event: RunEvent = serde_json::from_str(r#"{"type":"future:thing","x":1}"#).unwrap();
    assert_eq!(event, RunEvent::Custom);
}

#[test]
fn finalized_is_terminal() {
    let event = RunEvent::RunFinalized {
        status: RunStatus::Done,
        reason: "complete".to_string(),
        at: "2020-01-01T00:00:00.000Z".to_string(),
    };
    assert!(event.is_terminal());
    assert!(!RunEvent::Custom.is_terminal());
}
