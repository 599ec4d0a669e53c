// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task mirror directories: `state.json` and the rendered working set.

use crate::fsutil::{read_json, write_atomic};
use crate::{ArtifactStore, StoreError};
use agx_core::Task;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inputs for creating a local task mirror.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_request: String,
    pub goal: String,
    pub task_slug: String,
}

/// Local task lifecycle record (`state.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskState {
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArtifactStore {
    /// Create the task directory skeleton and initial `state.json`.
    pub fn create_task(
        &self,
        project_slug: &str,
        create: CreateTask,
        now_iso: &str,
    ) -> Result<TaskState, StoreError> {
        let state = TaskState {
            slug: create.task_slug.clone(),
            user_request: Some(create.user_request),
            goal: Some(create.goal),
            created_at: Some(now_iso.to_string()),
            updated_at: Some(now_iso.to_string()),
            ..Default::default()
        };
        let path = self.task_dir(project_slug, &create.task_slug).join("state.json");
        let bytes = serde_json::to_vec_pretty(&state)
            .map_err(|e| StoreError::InvalidState { path: path.clone(), source: e })?;
        write_atomic(&path, &bytes)?;
        std::fs::create_dir_all(self.runs_dir(project_slug, &create.task_slug))
            .map_err(|e| StoreError::io(self.runs_dir(project_slug, &create.task_slug), e))?;
        Ok(state)
    }

    pub fn read_task_state(
        &self,
        project_slug: &str,
        task_slug: &str,
    ) -> Result<Option<TaskState>, StoreError> {
        read_json(&self.task_dir(project_slug, task_slug).join("state.json"))
    }

    /// Shallow-merge a partial into the task's `state.json`.
    pub fn update_task_state(
        &self,
        project_slug: &str,
        task_slug: &str,
        partial: &Map<String, Value>,
    ) -> Result<TaskState, StoreError> {
        let path = self.task_dir(project_slug, task_slug).join("state.json");
        let mut state: Map<String, Value> = read_json(&path)?.unwrap_or_default();
        for (key, value) in partial {
            state.insert(key.clone(), value.clone());
        }
        let merged: TaskState = serde_json::from_value(Value::Object(state))
            .map_err(|e| StoreError::InvalidState { path: path.clone(), source: e })?;
        let bytes = serde_json::to_vec_pretty(&merged)
            .map_err(|e| StoreError::InvalidState { path: path.clone(), source: e })?;
        write_atomic(&path, &bytes)?;
        Ok(merged)
    }

    /// Render `working_set.md` from the cloud task's fields.
    pub fn write_working_set(
        &self,
        project_slug: &str,
        task_slug: &str,
        task: &Task,
    ) -> Result<(), StoreError> {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", if task.title.is_empty() { &task.slug } else { &task.title }));
        md.push_str(&format!(
            "- task: `{}`\n- stage: {}\n- status: {}\n",
            task.slug, task.stage, task.status
        ));
        if let Some(provider) = &task.provider {
            md.push_str(&format!("- provider: {provider}\n"));
        }
        if let Some(model) = &task.model {
            md.push_str(&format!("- model: {model}\n"));
        }
        if !task.content.is_empty() {
            md.push_str("\n---\n\n");
            md.push_str(&task.content);
            if !task.content.ends_with('\n') {
                md.push('\n');
            }
        }
        let path = self.task_dir(project_slug, task_slug).join("working_set.md");
        write_atomic(&path, md.as_bytes())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
