// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph stores: optimistic versioning over memory or the filesystem.

use crate::event::GraphEventRecord;
use crate::model::{Graph, GraphId};
use crate::GraphError;
use agx_core::Clock;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Versioned graph persistence.
///
/// `replace_graph` is the only mutation path for existing graphs; it
/// enforces `if_match_graph_version` and bumps the version by exactly one.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn create_graph(&self, graph: &Graph) -> Result<(), GraphError>;

    async fn get_graph(&self, id: &GraphId) -> Result<Option<Graph>, GraphError>;

    async fn list_in_progress_graphs(&self) -> Result<Vec<Graph>, GraphError>;

    /// Version-guarded replace. On success the persisted graph carries
    /// `graph_version = current + 1`, the original `created_at`, and a
    /// fresh `updated_at`.
    async fn replace_graph(
        &self,
        id: &GraphId,
        next: &Graph,
        if_match_graph_version: u64,
    ) -> Result<Graph, GraphError>;

    async fn append_event(&self, id: &GraphId, event: &GraphEventRecord)
        -> Result<(), GraphError>;

    async fn get_events(&self, id: &GraphId) -> Result<Vec<GraphEventRecord>, GraphError>;
}

fn replaced(current: &Graph, next: &Graph, now_iso: String) -> Graph {
    let mut persisted = next.clone();
    persisted.graph_version = current.graph_version + 1;
    persisted.created_at = current.created_at.clone();
    persisted.updated_at = now_iso;
    persisted
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    graphs: HashMap<GraphId, Graph>,
    events: HashMap<GraphId, Vec<GraphEventRecord>>,
}

/// In-memory store for tests and ephemeral graphs.
#[derive(Clone)]
pub struct MemoryGraphStore<C: Clock> {
    state: Arc<Mutex<MemoryState>>,
    clock: C,
}

impl<C: Clock> MemoryGraphStore<C> {
    pub fn new(clock: C) -> Self {
        Self { state: Arc::new(Mutex::new(MemoryState::default())), clock }
    }
}

#[async_trait]
impl<C: Clock + 'static> GraphStore for MemoryGraphStore<C> {
    async fn create_graph(&self, graph: &Graph) -> Result<(), GraphError> {
        let mut state = self.state.lock();
        if state.graphs.contains_key(&graph.id) {
            return Err(GraphError::AlreadyExists(graph.id));
        }
        state.graphs.insert(graph.id, graph.clone());
        Ok(())
    }

    async fn get_graph(&self, id: &GraphId) -> Result<Option<Graph>, GraphError> {
        Ok(self.state.lock().graphs.get(id).cloned())
    }

    async fn list_in_progress_graphs(&self) -> Result<Vec<Graph>, GraphError> {
        let state = self.state.lock();
        let mut graphs: Vec<Graph> =
            state.graphs.values().filter(|g| g.is_in_progress()).cloned().collect();
        graphs.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(graphs)
    }

    async fn replace_graph(
        &self,
        id: &GraphId,
        next: &Graph,
        if_match_graph_version: u64,
    ) -> Result<Graph, GraphError> {
        let mut state = self.state.lock();
        let current = state.graphs.get(id).ok_or(GraphError::NotFound(*id))?;
        if current.graph_version != if_match_graph_version {
            return Err(GraphError::VersionConflict {
                graph_id: *id,
                expected: if_match_graph_version,
                actual: current.graph_version,
            });
        }
        let persisted = replaced(current, next, self.clock.now_iso());
        state.graphs.insert(*id, persisted.clone());
        Ok(persisted)
    }

    async fn append_event(
        &self,
        id: &GraphId,
        event: &GraphEventRecord,
    ) -> Result<(), GraphError> {
        self.state.lock().events.entry(*id).or_default().push(event.clone());
        Ok(())
    }

    async fn get_events(&self, id: &GraphId) -> Result<Vec<GraphEventRecord>, GraphError> {
        Ok(self.state.lock().events.get(id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

/// JSON-on-disk store: `graphs/<id>/graph.json` + `events.ndjson`.
///
/// A store-wide mutex serializes the read-check-write of `replace_graph`;
/// cross-process writers are out of scope (single daemon per store root).
#[derive(Clone)]
pub struct FsGraphStore<C: Clock> {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
    clock: C,
}

impl<C: Clock> FsGraphStore<C> {
    pub fn new(root: impl Into<PathBuf>, clock: C) -> Self {
        Self { root: root.into(), write_lock: Arc::new(Mutex::new(())), clock }
    }

    fn graph_dir(&self, id: &GraphId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn graph_path(&self, id: &GraphId) -> PathBuf {
        self.graph_dir(id).join("graph.json")
    }

    fn events_path(&self, id: &GraphId) -> PathBuf {
        self.graph_dir(id).join("events.ndjson")
    }

    fn read_graph(&self, id: &GraphId) -> Result<Option<Graph>, GraphError> {
        let bytes = match std::fs::read(self.graph_path(id)) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GraphError::Storage(e.to_string())),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| GraphError::Storage(e.to_string()))
    }

    fn write_graph(&self, graph: &Graph) -> Result<(), GraphError> {
        let dir = self.graph_dir(&graph.id);
        std::fs::create_dir_all(&dir).map_err(|e| GraphError::Storage(e.to_string()))?;
        let path = self.graph_path(&graph.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(graph)
            .map_err(|e| GraphError::Storage(e.to_string()))?;
        std::fs::write(&tmp, bytes).map_err(|e| GraphError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| GraphError::Storage(e.to_string()))
    }
}

#[async_trait]
impl<C: Clock + 'static> GraphStore for FsGraphStore<C> {
    async fn create_graph(&self, graph: &Graph) -> Result<(), GraphError> {
        let _guard = self.write_lock.lock();
        if self.read_graph(&graph.id)?.is_some() {
            return Err(GraphError::AlreadyExists(graph.id));
        }
        self.write_graph(graph)
    }

    async fn get_graph(&self, id: &GraphId) -> Result<Option<Graph>, GraphError> {
        self.read_graph(id)
    }

    async fn list_in_progress_graphs(&self) -> Result<Vec<Graph>, GraphError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GraphError::Storage(e.to_string())),
        };
        let mut ids: Vec<GraphId> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .map(GraphId::from_string)
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut graphs = Vec::new();
        for id in ids {
            if let Some(graph) = self.read_graph(&id)? {
                if graph.is_in_progress() {
                    graphs.push(graph);
                }
            }
        }
        Ok(graphs)
    }

    async fn replace_graph(
        &self,
        id: &GraphId,
        next: &Graph,
        if_match_graph_version: u64,
    ) -> Result<Graph, GraphError> {
        let _guard = self.write_lock.lock();
        let current = self.read_graph(id)?.ok_or(GraphError::NotFound(*id))?;
        if current.graph_version != if_match_graph_version {
            return Err(GraphError::VersionConflict {
                graph_id: *id,
                expected: if_match_graph_version,
                actual: current.graph_version,
            });
        }
        let persisted = replaced(&current, next, self.clock.now_iso());
        self.write_graph(&persisted)?;
        Ok(persisted)
    }

    async fn append_event(
        &self,
        id: &GraphId,
        event: &GraphEventRecord,
    ) -> Result<(), GraphError> {
        use std::io::Write;
        let dir = self.graph_dir(id);
        std::fs::create_dir_all(&dir).map_err(|e| GraphError::Storage(e.to_string()))?;
        let mut line =
            serde_json::to_string(event).map_err(|e| GraphError::Storage(e.to_string()))?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.events_path(id))
            .map_err(|e| GraphError::Storage(e.to_string()))?;
        file.write_all(line.as_bytes()).map_err(|e| GraphError::Storage(e.to_string()))
    }

    async fn get_events(&self, id: &GraphId) -> Result<Vec<GraphEventRecord>, GraphError> {
        let text = match std::fs::read_to_string(self.events_path(id)) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GraphError::Storage(e.to_string())),
        };
        let mut events = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            events.push(
                serde_json::from_str(line).map_err(|e| GraphError::Storage(e.to_string()))?,
            );
        }
        Ok(events)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
