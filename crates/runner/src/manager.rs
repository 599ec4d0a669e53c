// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide registry of spawned provider children.
//!
//! Workers register children on spawn and deregister on exit; `kill_all`
//! iterates the registry on shutdown. Each registration also writes a
//! heartbeat file so the daemon's orphan sweep can find children that
//! outlived a crashed daemon.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Heartbeat record for one spawned child (`procs/<pid>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub pid: u32,
    pub label: String,
    pub started_at: String,
}

/// Registry of live provider children.
///
/// Process-scoped and dependency-injected: construct once at daemon
/// startup, share via clone, tear down with [`ProcessManager::kill_all`].
#[derive(Clone)]
pub struct ProcessManager {
    children: Arc<Mutex<HashMap<u32, Heartbeat>>>,
    procs_dir: PathBuf,
}

impl ProcessManager {
    pub fn new(procs_dir: impl Into<PathBuf>) -> Self {
        Self { children: Arc::new(Mutex::new(HashMap::new())), procs_dir: procs_dir.into() }
    }

    pub fn procs_dir(&self) -> &Path {
        &self.procs_dir
    }

    fn heartbeat_path(&self, pid: u32) -> PathBuf {
        self.procs_dir.join(format!("{pid}.json"))
    }

    /// Register a spawned child and write its heartbeat file.
    pub fn register(&self, pid: u32, label: &str, started_at: &str) {
        let heartbeat = Heartbeat {
            pid,
            label: label.to_string(),
            started_at: started_at.to_string(),
        };
        if std::fs::create_dir_all(&self.procs_dir).is_ok() {
            match serde_json::to_vec(&heartbeat) {
                Ok(bytes) => {
                    if let Err(e) = std::fs::write(self.heartbeat_path(pid), bytes) {
                        tracing::warn!(pid, error = %e, "failed to write heartbeat");
                    }
                }
                Err(e) => tracing::warn!(pid, error = %e, "failed to encode heartbeat"),
            }
        }
        self.children.lock().insert(pid, heartbeat);
    }

    /// Deregister an exited child and remove its heartbeat file.
    pub fn deregister(&self, pid: u32) {
        self.children.lock().remove(&pid);
        let _ = std::fs::remove_file(self.heartbeat_path(pid));
    }

    pub fn live_pids(&self) -> Vec<u32> {
        self.children.lock().keys().copied().collect()
    }

    /// Terminate every registered child: SIGTERM, grace, then SIGKILL.
    pub async fn kill_all(&self, grace: Duration) {
        let pids = self.live_pids();
        if pids.is_empty() {
            return;
        }
        tracing::info!(count = pids.len(), "terminating spawned providers");
        for pid in &pids {
            let _ = kill(Pid::from_raw(*pid as i32), Signal::SIGTERM);
        }
        tokio::time::sleep(grace).await;
        for pid in pids {
            if pid_alive(pid) {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
            self.deregister(pid);
        }
    }

    /// Read every heartbeat file under a procs directory.
    pub fn read_heartbeats(procs_dir: &Path) -> Vec<Heartbeat> {
        let Ok(entries) = std::fs::read_dir(procs_dir) else {
            return Vec::new();
        };
        let mut heartbeats = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(bytes) = std::fs::read(&path) {
                if let Ok(heartbeat) = serde_json::from_slice::<Heartbeat>(&bytes) {
                    heartbeats.push(heartbeat);
                }
            }
        }
        heartbeats.sort_by_key(|h| h.pid);
        heartbeats
    }

    /// Remove the heartbeat file for a pid under a procs directory.
    pub fn remove_heartbeat(procs_dir: &Path, pid: u32) {
        let _ = std::fs::remove_file(procs_dir.join(format!("{pid}.json")));
    }
}

/// Signal-0 liveness probe.
pub(crate) fn pid_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
