// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider adapter seam.
//!
//! The iteration engine speaks to providers through this trait; the CLI
//! implementation shells out via agx-runner, tests script outputs.

use agx_runner::{
    run_provider_with_retries, CancellationWatcher, ProcessManager, ProviderOutput, ProviderSpec,
    RunnerError, RunnerHooks,
};
use async_trait::async_trait;
use std::time::Duration;

/// One provider invocation request.
#[derive(Debug, Clone)]
pub struct ProviderInvocation {
    /// Full argv; `args[0]` is the provider binary.
    pub args: Vec<String>,
    pub timeout: Duration,
    pub label: String,
}

/// Seam between the iteration engine and provider processes.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn run(
        &self,
        invocation: ProviderInvocation,
        hooks: &mut RunnerHooks,
        watcher: Option<&dyn CancellationWatcher>,
    ) -> Result<ProviderOutput, RunnerError>;
}

/// Real adapter spawning provider CLIs as child processes.
#[derive(Clone)]
pub struct CliProviderAdapter {
    manager: ProcessManager,
    retries: u32,
}

impl CliProviderAdapter {
    pub fn new(manager: ProcessManager, retries: u32) -> Self {
        Self { manager, retries }
    }
}

#[async_trait]
impl ProviderAdapter for CliProviderAdapter {
    async fn run(
        &self,
        invocation: ProviderInvocation,
        hooks: &mut RunnerHooks,
        watcher: Option<&dyn CancellationWatcher>,
    ) -> Result<ProviderOutput, RunnerError> {
        let spec = ProviderSpec {
            args: invocation.args,
            timeout: invocation.timeout,
            label: invocation.label,
            cwd: None,
        };
        run_provider_with_retries(&spec, self.retries, hooks, watcher, Some(&self.manager)).await
    }
}

/// Execute-phase argv: `<provider> --cloud-task <taskId> [--model <m>] [--prompt <text>]`.
pub(crate) fn execute_args(
    provider: &str,
    task_id: &str,
    model: Option<&str>,
    prompt: &str,
) -> Vec<String> {
    let mut args = vec![
        provider.to_string(),
        "--cloud-task".to_string(),
        task_id.to_string(),
    ];
    if let Some(model) = model {
        args.push("--model".to_string());
        args.push(model.to_string());
    }
    args.push("--prompt".to_string());
    args.push(prompt.to_string());
    args
}

/// Verify-phase argv: `<provider> --prompt <text> --print [--model <m>]`.
pub(crate) fn verify_args(provider: &str, model: Option<&str>, prompt: &str) -> Vec<String> {
    let mut args = vec![
        provider.to_string(),
        "--prompt".to_string(),
        prompt.to_string(),
        "--print".to_string(),
    ];
    if let Some(model) = model {
        args.push("--model".to_string());
        args.push(model.to_string());
    }
    args
}
