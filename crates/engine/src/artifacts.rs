// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Iteration artifact persistence.
//!
//! Written under the run container after every verify phase. Failures are
//! logged to `daemon/artifact_errors.log` and never abort the loop.

use crate::evidence::Evidence;
use agx_core::Decision;
use agx_store::RunHandle;
use std::path::Path;

const DEFAULT_PLAN: &str = "# Plan\n\n(no plan recorded)\n";

fn log_artifact_error(container_dir: &Path, now_iso: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(error = %error, "artifact write failed");
    let log_dir = container_dir.join("daemon");
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let line = format!("{now_iso} {error}\n");
    use std::io::Write;
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("artifact_errors.log"))
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn write_file(container_dir: &Path, rel: &str, bytes: &[u8], now_iso: &str) {
    let path = container_dir.join(rel);
    if let Some(parent) = path.parent() {
        if let Err(error) = std::fs::create_dir_all(parent) {
            log_artifact_error(container_dir, now_iso, &error);
            return;
        }
    }
    if let Err(error) = std::fs::write(&path, bytes) {
        log_artifact_error(container_dir, now_iso, &error);
    }
}

/// Persist the iteration's durable artifacts under the run container.
pub(crate) fn persist_iteration_artifacts(
    execute: &RunHandle,
    verify: &RunHandle,
    decision: &Decision,
    evidence: &Evidence,
    now_iso: &str,
) {
    let container = execute.container_dir().to_path_buf();

    // plan/plan.md at the container level.
    let plan = decision.plan_md.as_deref().unwrap_or(DEFAULT_PLAN);
    write_file(&container, "plan/plan.md", plan.as_bytes(), now_iso);

    // Execute side: implementation summary.
    let implementation = decision
        .implementation_summary_md
        .as_deref()
        .unwrap_or(&decision.summary);
    if let Err(error) =
        execute.write_artifact("implementation_summary.md", implementation.as_bytes())
    {
        log_artifact_error(&container, now_iso, &error);
    }

    // Verify side: verification report, full command payload, per-command
    // captures, git summaries.
    let verification = decision.verification_md.as_deref().unwrap_or(&decision.explanation);
    if let Err(error) = verify.write_artifact("verification.md", verification.as_bytes()) {
        log_artifact_error(&container, now_iso, &error);
    }

    match serde_json::to_vec_pretty(&serde_json::json!({
        "commands": evidence.commands,
        "results": evidence.results,
    })) {
        Ok(bytes) => {
            if let Err(error) = verify.write_artifact("verify_commands.json", &bytes) {
                log_artifact_error(&container, now_iso, &error);
            }
        }
        Err(error) => log_artifact_error(&container, now_iso, &error),
    }

    for (index, result) in evidence.results.iter().enumerate() {
        let base = format!("verify_results/{:02}-{}", index + 1, result.id);
        if let Err(error) =
            verify.write_artifact(&format!("{base}.stdout.txt"), result.stdout.as_bytes())
        {
            log_artifact_error(&container, now_iso, &error);
        }
        if let Err(error) =
            verify.write_artifact(&format!("{base}.stderr.txt"), result.stderr.as_bytes())
        {
            log_artifact_error(&container, now_iso, &error);
        }
    }

    if let Err(error) = verify.write_artifact("git_status.txt", evidence.git_status.as_bytes()) {
        log_artifact_error(&container, now_iso, &error);
    }
    if let Err(error) =
        verify.write_artifact("git_diffstat.txt", evidence.git_diff_stat.as_bytes())
    {
        log_artifact_error(&container, now_iso, &error);
    }
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
