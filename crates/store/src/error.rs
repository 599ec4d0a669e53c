// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no home directory available")]
    NoHomeDir,

    #[error("task lock held by pid {pid} since {acquired_at}")]
    LockHeld { pid: u32, acquired_at: String },

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid state file {path}: {source}")]
    InvalidState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
