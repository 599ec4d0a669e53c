// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `~/.agx` home directory: pid lock, task cache, audit log, logs.

use crate::DaemonError;
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Resolved daemon home layout.
pub struct AgxHome {
    root: PathBuf,
    // NOTE(lifetime): held to maintain the exclusive daemon pid lock
    #[allow(dead_code)]
    pid_lock: Option<File>,
}

impl AgxHome {
    /// Resolve the home directory without claiming the daemon lock.
    pub fn open() -> Result<Self, DaemonError> {
        let root = agx_store::agx_home().map_err(|_| DaemonError::NoHomeDir)?;
        std::fs::create_dir_all(&root).map_err(|e| DaemonError::io(&root, e))?;
        Ok(Self { root, pid_lock: None })
    }

    /// Resolve the home directory and claim the exclusive daemon pid lock.
    ///
    /// A second daemon against the same home fails with `AlreadyRunning`.
    pub fn open_exclusive() -> Result<Self, DaemonError> {
        let mut home = Self::open()?;
        let path = home.pid_path();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| DaemonError::io(&path, e))?;
        file.try_lock_exclusive()
            .map_err(|_| DaemonError::AlreadyRunning { path: path.clone() })?;
        let mut writer = &file;
        writer.set_len(0).map_err(|e| DaemonError::io(&path, e))?;
        writer
            .write_all(std::process::id().to_string().as_bytes())
            .map_err(|e| DaemonError::io(&path, e))?;
        home.pid_lock = Some(file);
        Ok(home)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pid_path(&self) -> PathBuf {
        self.root.join("daemon.pid")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    pub fn procs_dir(&self) -> PathBuf {
        self.root.join("procs")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn task_cache_path(&self) -> PathBuf {
        self.root.join("task_cache.json")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join("audit.log")
    }

    /// Append one ISO-stamped line to the audit log. Best effort.
    pub fn audit(&self, line: &str) {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let entry = format!("{now} {line}\n");
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.audit_log_path())
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(error) = result {
            tracing::warn!(error = %error, "audit log write failed");
        }
    }
}

#[cfg(test)]
#[path = "home_tests.rs"]
mod tests;
