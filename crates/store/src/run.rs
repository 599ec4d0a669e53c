// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run containers and sub-run handles.

use crate::fsutil::{append_ndjson_line, read_json, sync_file, write_atomic};
use crate::{ArtifactStore, StoreError};
use agx_core::{RunEvent, RunId, RunMeta, RunStage, RunStatus};
use std::path::{Path, PathBuf};

/// Inputs for opening a new sub-run.
#[derive(Debug, Clone)]
pub struct CreateRun {
    pub project_slug: String,
    pub task_slug: String,
    pub stage: RunStage,
    /// Reuse an existing container id to link an execute+verify pair.
    pub run_id: Option<RunId>,
    pub engine: String,
    pub model: Option<String>,
}

/// Open handle to one sub-run directory.
#[derive(Debug)]
pub struct RunHandle {
    meta: RunMeta,
    container_dir: PathBuf,
    stage_dir: PathBuf,
    finalized: bool,
}

/// A run found on disk without a terminal status.
#[derive(Debug, Clone)]
pub struct IncompleteRun {
    pub run_id: RunId,
    pub stage: RunStage,
    pub stage_dir: PathBuf,
    pub meta: RunMeta,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.meta.run_id
    }

    pub fn stage(&self) -> RunStage {
        self.meta.stage
    }

    pub fn meta(&self) -> &RunMeta {
        &self.meta
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Directory grouping this run's execute/verify sub-runs.
    pub fn container_dir(&self) -> &Path {
        &self.container_dir
    }

    pub fn stage_dir(&self) -> &Path {
        &self.stage_dir
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.stage_dir.join("artifacts")
    }

    pub fn events_path(&self) -> PathBuf {
        self.stage_dir.join("events.ndjson")
    }

    /// Record the prompt and a `run:prompt` trace event.
    pub fn write_prompt(&self, text: &str, label: &str, now_iso: &str) -> Result<(), StoreError> {
        write_atomic(&self.stage_dir.join("prompt.md"), text.as_bytes())?;
        self.append_event(&RunEvent::PromptWritten {
            label: label.to_string(),
            chars: text.chars().count(),
            at: now_iso.to_string(),
        })
    }

    pub fn write_output(&self, text: &str) -> Result<(), StoreError> {
        write_atomic(&self.stage_dir.join("output.md"), text.as_bytes())
    }

    pub fn write_decision<T: serde::Serialize>(&self, decision: &T) -> Result<(), StoreError> {
        let path = self.stage_dir.join("decision.json");
        let bytes = serde_json::to_vec_pretty(decision)
            .map_err(|e| StoreError::InvalidState { path: path.clone(), source: e })?;
        write_atomic(&path, &bytes)
    }

    /// Write raw bytes under `artifacts/<rel_path>`, creating parents.
    pub fn write_artifact(&self, rel_path: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.artifacts_dir().join(rel_path);
        write_atomic(&path, bytes)?;
        Ok(path)
    }

    pub fn append_event(&self, event: &RunEvent) -> Result<(), StoreError> {
        append_ndjson_line(&self.events_path(), event)
    }

    /// Finalize the run: terminal status into `meta.json`, terminal trace
    /// event, events log synced. Idempotent; a second call is a no-op.
    pub fn finalize(
        &mut self,
        status: RunStatus,
        reason: &str,
        now_iso: &str,
    ) -> Result<(), StoreError> {
        if self.finalized {
            return Ok(());
        }
        self.meta.status = status;
        self.meta.reason = Some(reason.to_string());
        self.meta.finalized_at = Some(now_iso.to_string());
        write_meta(&self.stage_dir, &self.meta)?;
        self.append_event(&RunEvent::RunFinalized {
            status,
            reason: reason.to_string(),
            at: now_iso.to_string(),
        })?;
        sync_file(&self.events_path())?;
        self.finalized = true;
        Ok(())
    }

    /// Shorthand: finalize as `failed` plus an error trace event.
    pub fn fail(
        &mut self,
        error: &str,
        code: Option<&str>,
        now_iso: &str,
    ) -> Result<(), StoreError> {
        if self.finalized {
            return Ok(());
        }
        self.append_event(&RunEvent::RunError {
            error: error.to_string(),
            code: code.map(str::to_string),
            at: now_iso.to_string(),
        })?;
        self.finalize(RunStatus::Failed, error, now_iso)
    }
}

fn write_meta(stage_dir: &Path, meta: &RunMeta) -> Result<(), StoreError> {
    let path = stage_dir.join("meta.json");
    let bytes = serde_json::to_vec_pretty(meta)
        .map_err(|e| StoreError::InvalidState { path: path.clone(), source: e })?;
    write_atomic(&path, &bytes)
}

const SUB_RUN_STAGES: [RunStage; 4] =
    [RunStage::Plan, RunStage::Execute, RunStage::Verify, RunStage::Resume];

impl ArtifactStore {
    /// Open a new sub-run, materializing its directory skeleton and
    /// initial `meta.json`.
    pub fn create_run(&self, create: CreateRun, now_iso: &str) -> Result<RunHandle, StoreError> {
        let run_id = create.run_id.unwrap_or_default();
        let container_dir = self
            .runs_dir(&create.project_slug, &create.task_slug)
            .join(run_id.as_str());
        let stage_dir = container_dir.join(create.stage.to_string());
        let artifacts = stage_dir.join("artifacts");
        std::fs::create_dir_all(&artifacts).map_err(|e| StoreError::io(&artifacts, e))?;

        let meta = RunMeta {
            run_id,
            stage: create.stage,
            engine: create.engine,
            model: create.model,
            created_at: now_iso.to_string(),
            status: RunStatus::Running,
            reason: None,
            finalized_at: None,
            recovered_from: None,
        };
        write_meta(&stage_dir, &meta)?;

        let handle = RunHandle { meta, container_dir, stage_dir, finalized: false };
        handle.append_event(&RunEvent::RunCreated {
            stage: create.stage,
            at: now_iso.to_string(),
        })?;
        Ok(handle)
    }

    /// Reopen a handle for an on-disk run (used by recovery).
    pub fn reopen_run(&self, incomplete: &IncompleteRun) -> RunHandle {
        let container_dir = incomplete
            .stage_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| incomplete.stage_dir.clone());
        RunHandle {
            meta: incomplete.meta.clone(),
            container_dir,
            stage_dir: incomplete.stage_dir.clone(),
            finalized: incomplete.meta.is_finalized(),
        }
    }

    /// Scan for sub-runs whose `meta.json` lacks a terminal status.
    pub fn find_incomplete_runs(
        &self,
        project_slug: &str,
        task_slug: &str,
    ) -> Result<Vec<IncompleteRun>, StoreError> {
        let runs_dir = self.runs_dir(project_slug, task_slug);
        let mut found = Vec::new();
        let entries = match std::fs::read_dir(&runs_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(StoreError::io(&runs_dir, e)),
        };
        let mut containers: Vec<PathBuf> =
            entries.filter_map(|e| e.ok().map(|e| e.path())).filter(|p| p.is_dir()).collect();
        containers.sort();
        for container in containers {
            for stage in SUB_RUN_STAGES {
                let stage_dir = container.join(stage.to_string());
                let Some(meta) = read_json::<RunMeta>(&stage_dir.join("meta.json"))? else {
                    continue;
                };
                if !meta.is_finalized() {
                    found.push(IncompleteRun {
                        run_id: meta.run_id,
                        stage: meta.stage,
                        stage_dir,
                        meta,
                    });
                }
            }
        }
        Ok(found)
    }

    /// Write a `resume` run referencing an abandoned one and finalize the
    /// abandoned run as failed.
    pub fn create_recovery_run(
        &self,
        project_slug: &str,
        task_slug: &str,
        incomplete: &IncompleteRun,
        now_iso: &str,
    ) -> Result<RunHandle, StoreError> {
        let mut abandoned = self.reopen_run(incomplete);
        abandoned.finalize(RunStatus::Failed, "daemon_restart", now_iso)?;

        let mut handle = self.create_run(
            CreateRun {
                project_slug: project_slug.to_string(),
                task_slug: task_slug.to_string(),
                stage: RunStage::Resume,
                run_id: None,
                engine: incomplete.meta.engine.clone(),
                model: incomplete.meta.model.clone(),
            },
            now_iso,
        )?;
        handle.meta.recovered_from = Some(incomplete.run_id);
        write_meta(&handle.stage_dir, &handle.meta)?;
        Ok(handle)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
