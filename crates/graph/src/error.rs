// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph runtime error types

use crate::model::GraphId;
use thiserror::Error;

/// Errors from the graph store, queue, and tick driver.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph {graph_id} version conflict: expected {expected}, actual {actual}")]
    VersionConflict { graph_id: GraphId, expected: u64, actual: u64 },

    #[error("graph not found: {0}")]
    NotFound(GraphId),

    #[error("graph {0} already exists")]
    AlreadyExists(GraphId),

    #[error("tick queue is stopped")]
    QueueStopped,

    #[error("storage error: {0}")]
    Storage(String),
}

impl GraphError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
