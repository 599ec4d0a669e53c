// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable tick queue.
//!
//! FIFO-ish delivery with singleton keys: at most one pending job per key.
//! The expiry bounds singleton suppression so a crashed consumer cannot
//! wedge a graph forever.

use crate::model::GraphId;
use crate::GraphError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// One queued tick request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickJob {
    pub graph_id: GraphId,
}

/// Durable FIFO-ish queue contract.
#[async_trait]
pub trait TickQueue: Send + Sync {
    /// Enqueue unless a pending job already carries `singleton_key`.
    /// Returns whether the job was actually enqueued.
    async fn send(
        &self,
        job: TickJob,
        singleton_key: &str,
        expire_in_seconds: u64,
    ) -> Result<bool, GraphError>;

    /// Pop the next job, waiting until one arrives. `None` once stopped
    /// and drained.
    async fn recv(&self) -> Option<TickJob>;

    /// Pop without waiting.
    fn try_recv(&self) -> Option<TickJob>;

    /// Stop the queue; pending jobs may still be drained via `try_recv`.
    fn stop(&self);
}

struct QueueEntry {
    job: TickJob,
    singleton_key: String,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<QueueEntry>,
    /// singleton key → suppression expiry
    pending_keys: HashMap<String, Instant>,
    stopped: bool,
}

impl QueueState {
    fn push(&mut self, job: TickJob, singleton_key: &str, expire_in_seconds: u64) -> bool {
        let now = Instant::now();
        if let Some(expiry) = self.pending_keys.get(singleton_key) {
            if *expiry > now {
                return false;
            }
        }
        self.pending_keys
            .insert(singleton_key.to_string(), now + Duration::from_secs(expire_in_seconds.max(1)));
        self.items.push_back(QueueEntry { job, singleton_key: singleton_key.to_string() });
        true
    }

    fn pop(&mut self) -> Option<TickJob> {
        let entry = self.items.pop_front()?;
        self.pending_keys.remove(&entry.singleton_key);
        Some(entry.job)
    }
}

// ---------------------------------------------------------------------------
// In-memory queue
// ---------------------------------------------------------------------------

/// In-memory tick queue for tests.
#[derive(Clone, Default)]
pub struct MemoryTickQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl MemoryTickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TickQueue for MemoryTickQueue {
    async fn send(
        &self,
        job: TickJob,
        singleton_key: &str,
        expire_in_seconds: u64,
    ) -> Result<bool, GraphError> {
        let mut state = self.state.lock();
        if state.stopped {
            return Err(GraphError::QueueStopped);
        }
        let queued = state.push(job, singleton_key, expire_in_seconds);
        drop(state);
        if queued {
            self.notify.notify_one();
        }
        Ok(queued)
    }

    async fn recv(&self) -> Option<TickJob> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(job) = state.pop() {
                    return Some(job);
                }
                if state.stopped {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    fn try_recv(&self) -> Option<TickJob> {
        self.state.lock().pop()
    }

    fn stop(&self) {
        self.state.lock().stopped = true;
        self.notify.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// Durable ndjson-backed queue
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    job: TickJob,
    singleton_key: String,
}

/// Durable queue persisting pending jobs as one JSON line each.
///
/// The whole pending set is rewritten on mutation; queues here hold at
/// most one job per in-progress graph, so the file stays tiny.
#[derive(Clone)]
pub struct NdjsonTickQueue {
    path: PathBuf,
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl NdjsonTickQueue {
    /// Open the queue file, loading any jobs left by a previous run.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GraphError> {
        let path = path.into();
        let mut state = QueueState::default();
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    let entry: PersistedEntry = serde_json::from_str(line)
                        .map_err(|e| GraphError::Storage(e.to_string()))?;
                    state.push(entry.job, &entry.singleton_key, 60);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(GraphError::Storage(e.to_string())),
        }
        Ok(Self { path, state: Arc::new(Mutex::new(state)), notify: Arc::new(Notify::new()) })
    }

    fn persist(&self, state: &QueueState) -> Result<(), GraphError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GraphError::Storage(e.to_string()))?;
        }
        let mut text = String::new();
        for entry in &state.items {
            let persisted = PersistedEntry {
                job: entry.job.clone(),
                singleton_key: entry.singleton_key.clone(),
            };
            text.push_str(
                &serde_json::to_string(&persisted)
                    .map_err(|e| GraphError::Storage(e.to_string()))?,
            );
            text.push('\n');
        }
        let tmp = self.path.with_extension("ndjson.tmp");
        std::fs::write(&tmp, text).map_err(|e| GraphError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| GraphError::Storage(e.to_string()))
    }
}

#[async_trait]
impl TickQueue for NdjsonTickQueue {
    async fn send(
        &self,
        job: TickJob,
        singleton_key: &str,
        expire_in_seconds: u64,
    ) -> Result<bool, GraphError> {
        let queued = {
            let mut state = self.state.lock();
            if state.stopped {
                return Err(GraphError::QueueStopped);
            }
            let queued = state.push(job, singleton_key, expire_in_seconds);
            if queued {
                self.persist(&state)?;
            }
            queued
        };
        if queued {
            self.notify.notify_one();
        }
        Ok(queued)
    }

    async fn recv(&self) -> Option<TickJob> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(job) = state.pop() {
                    let _ = self.persist(&state);
                    return Some(job);
                }
                if state.stopped {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    fn try_recv(&self) -> Option<TickJob> {
        let mut state = self.state.lock();
        let job = state.pop();
        if job.is_some() {
            let _ = self.persist(&state);
        }
        job
    }

    fn stop(&self) {
        self.state.lock().stopped = true;
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
