// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agx-client: REST client for the task service.

mod cache;
mod client;
mod error;
mod resolve;
mod types;

pub use cache::TaskCache;
pub use client::{ClientConfig, TaskServiceClient};
pub use error::ClientError;
pub use resolve::resolve_from_listing;
pub use types::{
    Comment, CompletionRequest, CompletionResponse, LogEntry, QueueResponse, TaskEnvelope,
};
