// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage requirement enforcement.
//!
//! A verifier may claim `done` without the evidence to back it. This pure
//! function downgrades such claims to `not_done` with a deterministic
//! explanation and next prompt.

use crate::evidence::Evidence;
use agx_core::decision::{normalize_decision, Decision, DecisionKind, DecisionPayload};
use agx_core::TaskStage;

fn downgrade(decision: Decision, explanation: &str, next_prompt: &str) -> Decision {
    let mut payload = DecisionPayload::from(decision);
    payload.done = Some(false);
    payload.decision = Some("not_done".to_string());
    payload.explanation = Some(explanation.to_string());
    payload.next_prompt = Some(next_prompt.to_string());
    normalize_decision(payload)
}

/// Downgrade a claimed `done` when stage-specific evidence is missing.
///
/// - ideation/planning: a written plan (`plan_md`) is required.
/// - execution/verification: at least one local verification command must
///   have passed, or (when nothing is detectable) the tree must show
///   changes.
///
/// Non-`done` decisions pass through unchanged (they are already
/// normalized, so `explanation` and `next_prompt` are filled).
pub fn enforce_stage_requirement(
    stage: TaskStage,
    decision: Decision,
    evidence: &Evidence,
) -> Decision {
    if decision.decision != DecisionKind::Done {
        return decision;
    }
    match stage {
        TaskStage::Ideation | TaskStage::Planning => {
            let has_plan =
                decision.plan_md.as_deref().is_some_and(|p| !p.trim().is_empty());
            if has_plan {
                decision
            } else {
                downgrade(
                    decision,
                    "Claimed done without a written plan for this stage.",
                    "Write the plan as markdown and include it as plan_md in your decision.",
                )
            }
        }
        TaskStage::Execution | TaskStage::Verification => {
            let backed = evidence.any_check_passed()
                || (evidence.commands.is_empty() && evidence.has_changes());
            if backed {
                decision
            } else {
                downgrade(
                    decision,
                    "Claimed done but no local verification command passed.",
                    "Run the repository's checks, fix any failures, and finish with passing verification.",
                )
            }
        }
        TaskStage::Done => decision,
    }
}

#[cfg(test)]
#[path = "requirement_tests.rs"]
mod tests;
