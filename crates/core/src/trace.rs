// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run trace events, one JSON object per `events.ndjson` line.
//!
//! Serializes with `{"type": "scope:name", ...fields}` format.
//! Unknown type tags deserialize to `Custom`.

use serde::{Deserialize, Serialize};

/// Events appended to a run's trace log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    // -- provider child process --
    #[serde(rename = "provider:start")]
    ProviderStart {
        pid: Option<u32>,
        args: Vec<String>,
        timeout_ms: u64,
        started_at: String,
    },

    #[serde(rename = "provider:exit")]
    ProviderExit {
        exit_code: i32,
        duration_ms: u64,
        finished_at: String,
        stdout_tail: String,
        stderr_tail: String,
    },

    #[serde(rename = "provider:timeout")]
    ProviderTimeout {
        timeout_ms: u64,
        duration_ms: u64,
        finished_at: String,
        stdout_tail: String,
        stderr_tail: String,
    },

    #[serde(rename = "provider:cancel")]
    ProviderCancel {
        reason: String,
        finished_at: String,
    },

    #[serde(rename = "provider:error")]
    ProviderError {
        error: String,
        finished_at: String,
    },

    // -- run lifecycle --
    #[serde(rename = "run:created")]
    RunCreated {
        stage: crate::run::RunStage,
        at: String,
    },

    #[serde(rename = "run:prompt")]
    PromptWritten {
        label: String,
        chars: usize,
        at: String,
    },

    #[serde(rename = "run:finalized")]
    RunFinalized {
        status: crate::run::RunStatus,
        reason: String,
        at: String,
    },

    #[serde(rename = "run:error")]
    RunError {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        at: String,
    },

    /// Unknown event type (forward compatibility).
    #[serde(other)]
    Custom,
}

impl RunEvent {
    /// Terminal events close a run's trace log.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinalized { .. })
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
