// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery of incomplete runs.

use agx_store::ArtifactStore;

fn subdirs(path: &std::path::Path) -> Vec<(String, std::path::PathBuf)> {
    let Ok(entries) = std::fs::read_dir(path) else {
        return Vec::new();
    };
    let mut dirs: Vec<(String, std::path::PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok().map(|name| (name, e.path())))
        .collect();
    dirs.sort();
    dirs
}

/// Sweep every task mirror for runs abandoned by a previous daemon.
///
/// Each incomplete run is finalized `failed` with reason `daemon_restart`
/// and a fresh `resume` run referencing it is written. Returns how many
/// runs were recovered.
pub fn recover_incomplete_runs(store: &ArtifactStore, now_iso: &str) -> usize {
    let mut recovered = 0;
    for (project_slug, project_dir) in subdirs(store.root()) {
        for (task_slug, task_dir) in subdirs(&project_dir) {
            if !task_dir.join("runs").is_dir() {
                continue;
            }
            let incomplete = match store.find_incomplete_runs(&project_slug, &task_slug) {
                Ok(runs) => runs,
                Err(error) => {
                    tracing::warn!(
                        project = %project_slug,
                        task = %task_slug,
                        error = %error,
                        "incomplete-run scan failed"
                    );
                    continue;
                }
            };
            for run in incomplete {
                // A dangling resume run is itself a recovery record; close
                // it directly instead of chaining resume-of-resume.
                if run.stage == agx_core::RunStage::Resume {
                    let mut handle = store.reopen_run(&run);
                    if let Err(error) =
                        handle.finalize(agx_core::RunStatus::Failed, "daemon_restart", now_iso)
                    {
                        tracing::warn!(run = %run.run_id, error = %error, "failed to close resume run");
                    } else {
                        recovered += 1;
                    }
                    continue;
                }
                match store.create_recovery_run(&project_slug, &task_slug, &run, now_iso) {
                    Ok(recovery) => {
                        tracing::info!(
                            task = %task_slug,
                            abandoned = %run.run_id,
                            resume = %recovery.run_id(),
                            "recovered incomplete run"
                        );
                        recovered += 1;
                    }
                    Err(error) => {
                        tracing::warn!(
                            task = %task_slug,
                            run = %run.run_id,
                            error = %error,
                            "recovery failed"
                        );
                    }
                }
            }
        }
    }
    recovered
}

#[cfg(test)]
#[path = "recover_tests.rs"]
mod tests;
