// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task exclusive locks.
//!
//! A `task.lock` file holds `{pid, acquired_at}` and an advisory exclusive
//! flock. Exactly one worker per (project, task) on this machine.

use crate::fsutil::read_json;
use crate::{ArtifactStore, StoreError};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: String,
}

/// Held task lock. Released on drop (or explicitly via [`TaskLock::release`]).
#[derive(Debug)]
pub struct TaskLock {
    path: PathBuf,
    // NOTE(lifetime): held to maintain the exclusive flock; released on drop
    #[allow(dead_code)]
    file: File,
}

impl TaskLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove the sentinel file.
    pub fn release(self) {
        let path = self.path.clone();
        drop(self);
        let _ = std::fs::remove_file(path);
    }
}

fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

impl ArtifactStore {
    /// Acquire the task lock under `task_root`.
    ///
    /// Fails with [`StoreError::LockHeld`] when another live process holds
    /// it. `force = true` steals a lock whose recorded holder is dead.
    pub fn acquire_task_lock(&self, task_root: &Path, force: bool) -> Result<TaskLock, StoreError> {
        std::fs::create_dir_all(task_root).map_err(|e| StoreError::io(task_root, e))?;
        let path = task_root.join("task.lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        if file.try_lock_exclusive().is_err() {
            let info: Option<LockInfo> = read_json(&path).unwrap_or(None);
            let (pid, acquired_at) = match &info {
                Some(i) => (i.pid, i.acquired_at.clone()),
                None => (0, String::new()),
            };
            let stale = !pid_alive(pid);
            if !(force && stale) {
                return Err(StoreError::LockHeld { pid, acquired_at });
            }
            // Stale holder: remove the sentinel and retry once.
            tracing::warn!(pid, path = %path.display(), "stealing stale task lock");
            std::fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
            return self.acquire_task_lock(task_root, false);
        }

        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };
        let mut writer = &file;
        writer.set_len(0).map_err(|e| StoreError::io(&path, e))?;
        let bytes = serde_json::to_vec(&info)
            .map_err(|e| StoreError::InvalidState { path: path.clone(), source: e })?;
        writer.write_all(&bytes).map_err(|e| StoreError::io(&path, e))?;
        writer.flush().map_err(|e| StoreError::io(&path, e))?;

        Ok(TaskLock { path, file })
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
