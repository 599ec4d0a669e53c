// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon error types

use thiserror::Error;

/// Fatal daemon errors; everything else is logged and survived.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("no home directory available")]
    NoHomeDir,

    #[error("another daemon holds the pid lock at {path}")]
    AlreadyRunning { path: std::path::PathBuf },

    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] agx_store::StoreError),
}

impl DaemonError {
    pub(crate) fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
