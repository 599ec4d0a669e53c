// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphan sweep: reap heartbeat files whose pids are gone.

use agx_runner::ProcessManager;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn pid_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

/// One pass over the heartbeat directory. Returns the reaped pids.
pub fn sweep_once(procs_dir: &std::path::Path) -> Vec<u32> {
    let mut reaped = Vec::new();
    for heartbeat in ProcessManager::read_heartbeats(procs_dir) {
        if !pid_alive(heartbeat.pid) {
            tracing::info!(
                pid = heartbeat.pid,
                label = %heartbeat.label,
                "reaping orphan heartbeat"
            );
            ProcessManager::remove_heartbeat(procs_dir, heartbeat.pid);
            reaped.push(heartbeat.pid);
        }
    }
    reaped
}

/// Periodic sweep task; runs every 60 s until the stop token fires.
pub async fn orphan_sweep(procs_dir: PathBuf, stop: CancellationToken) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(SWEEP_INTERVAL) => {
                sweep_once(&procs_dir);
            }
            _ = stop.cancelled() => break,
        }
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
