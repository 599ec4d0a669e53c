// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud task mirror types.
//!
//! The task service owns these records; the orchestrator holds per-run
//! copies and patches them back through the client.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    Ideation,
    Planning,
    Execution,
    Verification,
    Done,
}

crate::simple_display! {
    TaskStage {
        Ideation => "ideation",
        Planning => "planning",
        Execution => "execution",
        Verification => "verification",
        Done => "done",
    }
}

impl TaskStage {
    /// One-line objective embedded in verifier prompts.
    pub fn objective(&self) -> &'static str {
        match self {
            Self::Ideation => "produce a concrete idea and acceptance criteria",
            Self::Planning => "produce an ordered implementation plan",
            Self::Execution => "implement the planned work in the repository",
            Self::Verification => "verify the implemented work against the plan",
            Self::Done => "no further work",
        }
    }
}

/// Remote status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    InProgress,
    Blocked,
    Completed,
    Failed,
}

crate::simple_display! {
    TaskStatus {
        Queued => "queued",
        InProgress => "in_progress",
        Blocked => "blocked",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Project identity nested inside a task.
///
/// Stored by id and resolved on read; no in-memory back-pointers (they
/// drift when either side is patched remotely).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProject {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A task as returned by the task service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    /// Markdown body with frontmatter, rendered into the working set.
    #[serde(default)]
    pub content: String,
    pub stage: TaskStage,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub swarm: bool,
    #[serde(default)]
    pub project: TaskProject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Task {
    /// Whether the remote record already reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
