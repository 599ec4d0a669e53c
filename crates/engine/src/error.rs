// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use thiserror::Error;

/// Errors that escape the iteration engine.
///
/// Everything else folds into a normalized `failed` decision; only
/// cancellation and store failures unwind.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cancellation requested: {reason}")]
    Cancelled { reason: String },

    #[error(transparent)]
    Store(#[from] agx_store::StoreError),
}
