// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted task-listing cache backing numeric identifier lookup.

use crate::ClientError;
use agx_core::Task;
use std::path::PathBuf;

/// Last `GET /api/tasks` listing, persisted as JSON.
#[derive(Debug, Clone)]
pub struct TaskCache {
    path: PathBuf,
}

impl TaskCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn store(&self, tasks: &[Task]) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ClientError::Cache(e.to_string()))?;
        }
        let bytes =
            serde_json::to_vec(tasks).map_err(|e| ClientError::Cache(e.to_string()))?;
        std::fs::write(&self.path, bytes).map_err(|e| ClientError::Cache(e.to_string()))
    }

    /// Load the cached listing, `None` when no listing was ever stored.
    pub fn load(&self) -> Result<Option<Vec<Task>>, ClientError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::Cache(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ClientError::Cache(e.to_string()))
    }
}
