// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner error types

use thiserror::Error;

/// Errors from provider process supervision.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("provider exited with code {code}")]
    ExitedNonZero { code: i32, stdout: String, stderr: String },

    #[error("provider timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64, stdout_tail: String, stderr_tail: String },

    #[error("cancellation requested: {reason}")]
    Cancelled { reason: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error while supervising provider: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Cancellation never participates in retry loops.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
