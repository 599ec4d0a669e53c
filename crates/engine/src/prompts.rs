// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction for execute and verify phases.

use crate::evidence::Evidence;
use agx_core::{Decision, Task};

const STATUS_MAX_LINES: usize = 80;
const DIFF_MAX_LINES: usize = 60;

const DEFAULT_EXECUTE_PROMPT: &str =
    "Pick the next most valuable step toward completing the current stage and do it. \
     Keep the change focused and verifiable.";

/// Execute prompt for one iteration: the prior decision's `next_prompt`,
/// or the default first-step instruction.
pub fn execute_prompt(previous_next_prompt: Option<&str>) -> String {
    match previous_next_prompt {
        Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
        _ => DEFAULT_EXECUTE_PROMPT.to_string(),
    }
}

fn first_lines(text: &str, max_lines: usize) -> String {
    let mut lines: Vec<&str> = text.lines().take(max_lines + 1).collect();
    let truncated = lines.len() > max_lines;
    lines.truncate(max_lines);
    let mut out = lines.join("\n");
    if truncated {
        out.push_str("\n… (truncated)");
    }
    out
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// Verifier prompt: task identity, stage objective, completion
/// requirement, and the abbreviated evidence block, capped at `max_chars`.
pub fn verify_prompt(task: &Task, evidence: &Evidence, max_chars: usize) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "You are verifying work on task `{}` ({}), stage: {}.\n",
        task.slug,
        if task.title.is_empty() { "untitled" } else { &task.title },
        task.stage,
    ));
    prompt.push_str(&format!("Stage objective: {}.\n", task.stage.objective()));
    prompt.push_str(
        "The stage is complete only when the objective is demonstrably met by the \
         evidence below.\n\n",
    );

    prompt.push_str("## Local verification\n");
    if evidence.results.is_empty() {
        prompt.push_str("(no verification commands detected)\n");
    }
    for result in &evidence.results {
        prompt.push_str(&format!(
            "{} => exit={} {}ms\n",
            result.label, result.exit_code, result.duration_ms
        ));
    }

    if !evidence.git_status.trim().is_empty() {
        prompt.push_str("\n## git status --porcelain\n");
        prompt.push_str(&first_lines(&evidence.git_status, STATUS_MAX_LINES));
        prompt.push('\n');
    }
    if !evidence.git_diff_stat.trim().is_empty() {
        prompt.push_str("\n## git diff --stat\n");
        prompt.push_str(&first_lines(&evidence.git_diff_stat, DIFF_MAX_LINES));
        prompt.push('\n');
    }

    prompt.push_str(
        "\nRespond with a single JSON object: {\"done\": bool, \"decision\": \
         \"done|blocked|not_done|failed\", \"explanation\": str, \"final_result\": str, \
         \"next_prompt\": str, \"summary\": str} with optional \"plan_md\", \
         \"implementation_summary_md\", \"verification_md\".\n",
    );

    truncate_chars(&prompt, max_chars)
}

/// Decision-context-augmented next prompt: the verifier's `next_prompt`
/// prefixed with bullets summarizing the previous iteration.
pub fn augmented_next_prompt(decision: &Decision) -> String {
    let mut prompt = String::new();
    prompt.push_str("Context from the previous iteration:\n");
    prompt.push_str(&format!("- decision: {}\n", decision.decision));
    prompt.push_str(&format!("- summary: {}\n", decision.summary));
    prompt.push_str(&format!("- explanation: {}\n", decision.explanation));
    prompt.push_str(&format!("- result so far: {}\n", decision.final_result));
    prompt.push('\n');
    prompt.push_str(&execute_prompt(decision.next_prompt.as_deref()));
    prompt
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
