// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for decision normalization

use super::*;
use proptest::prelude::*;
use yare::parameterized;

#[parameterized(
    done = { "done", DecisionKind::Done },
    blocked = { "blocked", DecisionKind::Blocked },
    not_done = { "not_done", DecisionKind::NotDone },
    failed = { "failed", DecisionKind::Failed },
    garbage = { "maybe_later", DecisionKind::Failed },
    empty = { "", DecisionKind::Failed },
)]
fn decision_clamps_to_allowed_set(raw: &str, expected: DecisionKind) {
    let normalized = normalize_decision(DecisionPayload {
        decision: Some(raw.to_string()),
        ..Default::default()
    });
    assert_eq!(normalized.decision, expected);
}

#[test]
fn done_flag_backs_up_missing_decision_string() {
    let done = normalize_decision(DecisionPayload { done: Some(true), ..Default::default() });
    assert_eq!(done.decision, DecisionKind::Done);

    let not_done = normalize_decision(DecisionPayload { done: Some(false), ..Default::default() });
    assert_eq!(not_done.decision, DecisionKind::NotDone);

    let neither = normalize_decision(DecisionPayload::default());
    assert_eq!(neither.decision, DecisionKind::Failed);
}

#[test]
fn fallbacks_fill_required_fields() {
    let d = normalize_decision(DecisionPayload {
        decision: Some("not_done".to_string()),
        explanation: Some("   ".to_string()),
        ..Default::default()
    });
    assert!(!d.explanation.trim().is_empty());
    assert!(!d.final_result.trim().is_empty());
    assert!(!d.summary.trim().is_empty());
    assert!(d.next_prompt.as_deref().is_some_and(|p| !p.trim().is_empty()));
}

#[test]
fn done_decisions_may_omit_next_prompt() {
    let d = normalize_decision(DecisionPayload {
        decision: Some("done".to_string()),
        ..Default::default()
    });
    assert!(d.next_prompt.is_none());
}

#[test]
fn optional_markdown_fields_are_preserved() {
    let d = normalize_decision(DecisionPayload {
        decision: Some("done".to_string()),
        plan_md: Some("# Plan".to_string()),
        verification_md: Some("ok".to_string()),
        ..Default::default()
    });
    assert_eq!(d.plan_md.as_deref(), Some("# Plan"));
    assert_eq!(d.verification_md.as_deref(), Some("ok"));
    assert!(d.implementation_summary_md.is_none());
}

#[test]
fn extra_fields_survive_normalization() {
    let payload: DecisionPayload = serde_json::from_str(
        r#"{"decision":"done","explanation":"fine","confidence":0.9}"#,
    )
    .unwrap();
    let d = normalize_decision(payload);
    assert_eq!(d.extra.get("confidence"), Some(&serde_json::json!(0.9)));
}

#[test]
fn run_status_translation() {
    assert_eq!(DecisionKind::Done.run_status(), RunStatus::Done);
    assert_eq!(DecisionKind::Blocked.run_status(), RunStatus::Blocked);
    assert_eq!(DecisionKind::NotDone.run_status(), RunStatus::Continue);
    assert_eq!(DecisionKind::Failed.run_status(), RunStatus::Failed);
}

#[test]
fn exit_code_is_zero_only_for_done() {
    assert_eq!(Decision::failed("x").exit_code(), 1);
    let done = normalize_decision(DecisionPayload {
        decision: Some("done".to_string()),
        ..Default::default()
    });
    assert_eq!(done.exit_code(), 0);
}

fn arb_payload() -> impl Strategy<Value = DecisionPayload> {
    (
        proptest::option::of(any::<bool>()),
        proptest::option::of("[a-z_]{0,12}"),
        proptest::option::of(".{0,40}"),
        proptest::option::of(".{0,40}"),
        proptest::option::of(".{0,40}"),
        proptest::option::of(".{0,40}"),
    )
        .prop_map(|(done, decision, explanation, final_result, next_prompt, summary)| {
            DecisionPayload {
                done,
                decision,
                explanation,
                final_result,
                next_prompt,
                summary,
                ..Default::default()
            }
        })
}

proptest! {
    // Normalization is idempotent and always lands in the allowed set
    // with a non-empty explanation.
    #[test]
    fn normalize_is_idempotent(payload in arb_payload()) {
        let once = normalize_decision(payload);
        let twice = normalize_decision(DecisionPayload::from(once.clone()));
        prop_assert_eq!(&once, &twice);
        prop_assert!(!once.explanation.trim().is_empty());
        if !once.done {
            prop_assert!(once.next_prompt.as_deref().is_some_and(|p| !p.trim().is_empty()));
        }
    }
}
