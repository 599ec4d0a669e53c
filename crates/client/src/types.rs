// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the task service API.

use agx_core::{RunIndexEntry, Task};
use serde::{Deserialize, Serialize};

/// `GET /api/queue` response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub task: Option<Task>,
}

/// `GET /api/tasks/:id` and slug-query responses.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskEnvelope {
    #[serde(default)]
    pub task: Option<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskListing {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommentListing {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LogListing {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// One comment on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub author_type: String,
    #[serde(default)]
    pub created_at: String,
    pub content: String,
}

/// One log line on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub log_type: String,
    pub content: String,
}

/// `POST /api/queue/complete` request body.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub log: String,
    pub decision: agx_core::DecisionKind,
    pub final_result: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_entry: Option<RunIndexEntry>,
}

/// `POST /api/queue/complete` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub task: Task,
    #[serde(rename = "newStage")]
    pub new_stage: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}
