// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client error types

use thiserror::Error;

/// Errors from the task service client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("task service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("no cached task listing; run a listing first to use numeric identifiers")]
    NoCachedTask,

    #[error("identifier {identifier:?} is ambiguous: {}", candidates.join(", "))]
    Ambiguous { identifier: String, candidates: Vec<String> },

    #[error("no task matches {0:?}")]
    TaskNotFound(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache error: {0}")]
    Cache(String),
}
