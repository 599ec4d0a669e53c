// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run records: one execute-or-verify attempt under a stage.
//!
//! A run container groups the execute and verify sub-runs of one
//! iteration; both share the container's [`RunId`].

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a run container.
    pub struct RunId("run-");
}

/// Stage of a sub-run within its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Plan,
    Execute,
    Verify,
    Resume,
}

crate::simple_display! {
    RunStage {
        Plan => "plan",
        Execute => "execute",
        Verify => "verify",
        Resume => "resume",
    }
}

/// Status of a run.
///
/// `Continue` means the verifier asked for another iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Done,
    Continue,
    Failed,
    Blocked,
}

crate::simple_display! {
    RunStatus {
        Running => "running",
        Done => "done",
        Continue => "continue",
        Failed => "failed",
        Blocked => "blocked",
    }
}

impl RunStatus {
    /// A run with a terminal status has been finalized.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Persistent metadata for a single sub-run (`meta.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: RunId,
    pub stage: RunStage,
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<String>,
    /// Set on `resume` runs: the run this one recovers from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered_from: Option<RunId>,
}

impl RunMeta {
    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Kind of a manifest entry in a run index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    Artifact,
    Prompt,
    Output,
    Events,
}

/// One file recorded in a run's artifact manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifestEntry {
    pub kind: ManifestKind,
    /// Local URI: `local://<host><abs-path>`.
    pub key: String,
    pub bytes: u64,
    /// Omitted for files larger than the configured ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Summary of a completed run, posted alongside the completion payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunIndexEntry {
    pub run_id: RunId,
    pub stage: RunStage,
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: RunStatus,
    pub created_at: String,
    #[serde(default)]
    pub artifact_manifest: Vec<ArtifactManifestEntry>,
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
