// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agx-runner: Spawns and supervises external provider processes.
//!
//! Providers are opaque child processes. The runner streams their output,
//! maintains bounded tails for trace events, and enforces timeouts and
//! cooperative cancellation.

mod error;
mod manager;
mod spawn;
mod watcher;

pub use error::RunnerError;
pub use manager::{Heartbeat, ProcessManager};
pub use spawn::{run_provider, run_provider_with_retries, ProviderOutput, ProviderSpec, RunnerHooks};
pub use watcher::{CancellationWatcher, ManualWatcher, Subscription};
