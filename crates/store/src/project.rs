// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project mirror directories and their `state.json`.

use crate::fsutil::{read_json, write_atomic};
use crate::slug::{collision_suffix, slugify, DEFAULT_MAX_LEN};
use crate::{ArtifactStore, StoreError};
use serde_json::{Map, Value};

impl ArtifactStore {
    /// Pick the directory slug for a cloud project, idempotently.
    ///
    /// The base slug derives from the project name. If that directory is
    /// already claimed by a *different* cloud id, a stable suffix derived
    /// from a hash of the cloud id is appended, so the same cloud project
    /// maps to the same folder across restarts.
    pub fn select_project_slug(
        &self,
        cloud_project_id: &str,
        name: &str,
    ) -> Result<String, StoreError> {
        let base = slugify(name, DEFAULT_MAX_LEN);
        match self.read_project_state(&base)? {
            Some(state) => {
                let existing = state.get("cloud_project_id").and_then(Value::as_str);
                match existing {
                    Some(id) if id != cloud_project_id => {
                        Ok(format!("{base}-{}", collision_suffix(cloud_project_id)))
                    }
                    _ => Ok(base),
                }
            }
            None => Ok(base),
        }
    }

    /// Merge a partial into the project's `state.json`.
    ///
    /// Shallow merge: every caller-provided field overwrites, including the
    /// cloud-identity fields, so identity drift shows up in the file rather
    /// than being silently retained.
    pub fn write_project_state(
        &self,
        project_slug: &str,
        partial: &Map<String, Value>,
    ) -> Result<Map<String, Value>, StoreError> {
        let path = self.project_dir(project_slug).join("state.json");
        let mut state: Map<String, Value> = read_json(&path)?.unwrap_or_default();
        for (key, value) in partial {
            state.insert(key.clone(), value.clone());
        }
        let bytes = serde_json::to_vec_pretty(&state)
            .map_err(|e| StoreError::InvalidState { path: path.clone(), source: e })?;
        write_atomic(&path, &bytes)?;
        Ok(state)
    }

    /// Read the project's `state.json`, `None` when the project is unknown.
    pub fn read_project_state(
        &self,
        project_slug: &str,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        read_json(&self.project_dir(project_slug).join("state.json"))
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
