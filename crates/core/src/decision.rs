// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verifier decision payloads and the normalizer.
//!
//! Decisions arrive as free-form JSON from an LLM verifier. The raw shape
//! is [`DecisionPayload`]; every code path goes through
//! [`normalize_decision`] before acting on one. Forward-compat fields ride
//! in an unstructured map and are preserved.

use crate::run::RunStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Adjudication outcome, clamped to the allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Done,
    Blocked,
    NotDone,
    Failed,
}

crate::simple_display! {
    DecisionKind {
        Done => "done",
        Blocked => "blocked",
        NotDone => "not_done",
        Failed => "failed",
    }
}

impl DecisionKind {
    /// Whether this decision ends the iteration loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Blocked | Self::Failed)
    }

    /// Run status recorded for an iteration that produced this decision.
    pub fn run_status(&self) -> RunStatus {
        match self {
            Self::Done => RunStatus::Done,
            Self::Blocked => RunStatus::Blocked,
            Self::NotDone => RunStatus::Continue,
            Self::Failed => RunStatus::Failed,
        }
    }
}

/// Raw decision payload as parsed from verifier output.
///
/// Everything is optional; unknown fields are collected so they survive
/// normalization and re-serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_md: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_summary_md: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_md: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A normalized decision. Always safe to act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: DecisionKind,
    pub done: bool,
    pub explanation: String,
    pub final_result: String,
    pub summary: String,
    /// Present whenever the decision is not `done`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_md: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_summary_md: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_md: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

const FALLBACK_EXPLANATION: &str = "No explanation provided.";
const FALLBACK_RESULT: &str = "No result recorded.";
const FALLBACK_SUMMARY: &str = "No summary provided.";
const FALLBACK_NEXT_PROMPT: &str =
    "Continue with the next most valuable step toward completing the stage.";

/// Normalize a raw decision payload.
///
/// Clamps `decision` to the allowed set (anything unrecognized becomes
/// `failed`), guarantees non-empty `explanation`, `final_result`, and
/// `summary`, and fills `next_prompt` whenever the decision is not `done`.
/// Idempotent: normalizing a normalized decision is a no-op.
pub fn normalize_decision(payload: DecisionPayload) -> Decision {
    let decision = match payload.decision.as_deref().map(str::trim) {
        Some("done") => DecisionKind::Done,
        Some("blocked") => DecisionKind::Blocked,
        Some("not_done") => DecisionKind::NotDone,
        Some("failed") => DecisionKind::Failed,
        Some(_) => DecisionKind::Failed,
        // No decision string: fall back to the boolean flag.
        None => match payload.done {
            Some(true) => DecisionKind::Done,
            Some(false) => DecisionKind::NotDone,
            None => DecisionKind::Failed,
        },
    };
    let done = decision == DecisionKind::Done;

    let explanation = non_empty(payload.explanation, FALLBACK_EXPLANATION);
    let final_result = non_empty(payload.final_result, FALLBACK_RESULT);
    let summary = non_empty(payload.summary, FALLBACK_SUMMARY);
    let next_prompt = if done {
        payload.next_prompt.filter(|s| !s.trim().is_empty())
    } else {
        Some(non_empty(payload.next_prompt, FALLBACK_NEXT_PROMPT))
    };

    Decision {
        decision,
        done,
        explanation,
        final_result,
        summary,
        next_prompt,
        plan_md: payload.plan_md,
        implementation_summary_md: payload.implementation_summary_md,
        verification_md: payload.verification_md,
        extra: payload.extra,
    }
}

fn non_empty(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => fallback.to_string(),
    }
}

impl From<Decision> for DecisionPayload {
    fn from(d: Decision) -> Self {
        Self {
            done: Some(d.done),
            decision: Some(d.decision.to_string()),
            explanation: Some(d.explanation),
            final_result: Some(d.final_result),
            next_prompt: d.next_prompt,
            summary: Some(d.summary),
            plan_md: d.plan_md,
            implementation_summary_md: d.implementation_summary_md,
            verification_md: d.verification_md,
            extra: d.extra,
        }
    }
}

impl Decision {
    /// A synthesized `failed` decision with the given explanation.
    pub fn failed(explanation: impl Into<String>) -> Self {
        normalize_decision(DecisionPayload {
            decision: Some("failed".to_string()),
            explanation: Some(explanation.into()),
            ..Default::default()
        })
    }

    /// Process exit code for the iteration-engine caller.
    pub fn exit_code(&self) -> i32 {
        if self.decision == DecisionKind::Done {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
