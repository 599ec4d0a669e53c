// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Swarm execute phase: one provider child per configured provider.
//!
//! The swarm differs from single-agent only in how the execute phase
//! produces output; verification still runs once over the aggregate.

use crate::provider::{execute_args, ProviderAdapter, ProviderInvocation};
use agx_runner::{CancellationWatcher, RunnerError, RunnerHooks};
use std::time::Duration;

/// Aggregated output of a swarm execute phase.
#[derive(Debug, Clone)]
pub struct SwarmOutput {
    /// Per-provider sections, concatenated under provider headings.
    pub combined: String,
    /// Providers whose invocation failed, with the error text.
    pub failures: Vec<(String, String)>,
}

/// Run the execute phase with one child per provider, concurrently.
///
/// Concurrency is bounded by the provider count. Cancellation of any
/// child unwinds the whole phase.
pub async fn run_swarm_execute<P: ProviderAdapter>(
    adapter: &P,
    providers: &[String],
    task_id: &str,
    model: Option<&str>,
    prompt: &str,
    timeout: Duration,
    watcher: Option<&dyn CancellationWatcher>,
) -> Result<SwarmOutput, RunnerError> {
    let mut futures = Vec::with_capacity(providers.len());
    for provider in providers {
        let invocation = ProviderInvocation {
            args: execute_args(provider, task_id, model, prompt),
            timeout,
            label: format!("{provider} execute (swarm)"),
        };
        futures.push(async move {
            // Hooks are per-child so stream callbacks don't interleave.
            let mut hooks = RunnerHooks::default();
            let result = adapter.run(invocation, &mut hooks, watcher).await;
            (provider.clone(), result)
        });
    }

    let results = futures_util::future::join_all(futures).await;

    let mut combined = String::new();
    let mut failures = Vec::new();
    for (provider, result) in results {
        match result {
            Ok(output) => {
                combined.push_str(&format!("## {provider}\n\n"));
                combined.push_str(&output.stdout);
                if !combined.ends_with('\n') {
                    combined.push('\n');
                }
                combined.push('\n');
            }
            Err(error) if error.is_cancellation() => return Err(error),
            Err(error) => failures.push((provider, error.to_string())),
        }
    }
    Ok(SwarmOutput { combined, failures })
}
