// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execute/verify iteration loop.
//!
//! One function with explicit state `(iteration, next_prompt, last run)`;
//! no recursion. Non-cancellation failures fold into a normalized `failed`
//! decision and the loop exits gracefully.

use crate::artifacts::persist_iteration_artifacts;
use crate::error::EngineError;
use crate::evidence::collect_evidence;
use crate::parse::parse_last_json_object;
use crate::prompts::{augmented_next_prompt, execute_prompt, verify_prompt};
use crate::provider::{execute_args, verify_args, ProviderAdapter, ProviderInvocation};
use crate::requirement::enforce_stage_requirement;
use crate::swarm::run_swarm_execute;
use agx_core::decision::{normalize_decision, Decision, DecisionPayload};
use agx_core::{Clock, Config, RunId, RunIndexEntry, RunStage, Task};
use agx_runner::{CancellationWatcher, RunnerError, RunnerHooks};
use agx_store::{build_run_index_entry, ArtifactStore, CreateRun, RunHandle};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;

/// Best-effort task service surface the engine posts progress through.
#[async_trait]
pub trait TaskSink: Send + Sync {
    async fn post_comment(
        &self,
        task_id: &str,
        content: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Inputs for one iteration-engine invocation.
#[derive(Debug, Clone)]
pub struct IterationRequest {
    pub task: Task,
    pub project_slug: String,
    pub task_slug: String,
    /// Provider binary for execute and verify phases.
    pub provider: String,
    pub model: Option<String>,
    /// Non-empty switches the execute phase to swarm fan-out.
    pub swarm_providers: Vec<String>,
    /// Recorded as `prompt.md` of the first execute run.
    pub initial_prompt_context: String,
    pub max_iters: u32,
    /// Repository the verification evidence inspects.
    pub workdir: PathBuf,
}

/// Result of the loop.
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    /// 0 only when the final decision is `done`.
    pub code: i32,
    pub decision: Decision,
    pub run_index_entry: Option<RunIndexEntry>,
    pub last_run: Option<RunId>,
}

/// Per-task execute/verify engine.
pub struct IterationEngine<P, S, C> {
    store: ArtifactStore,
    provider: P,
    sink: S,
    clock: C,
    config: Config,
}

impl<P, S, C> IterationEngine<P, S, C>
where
    P: ProviderAdapter,
    S: TaskSink,
    C: Clock,
{
    pub fn new(store: ArtifactStore, provider: P, sink: S, clock: C, config: Config) -> Self {
        Self { store, provider, sink, clock, config }
    }

    fn create_run(
        &self,
        request: &IterationRequest,
        stage: RunStage,
        container: RunId,
    ) -> Result<RunHandle, EngineError> {
        Ok(self.store.create_run(
            CreateRun {
                project_slug: request.project_slug.clone(),
                task_slug: request.task_slug.clone(),
                stage,
                run_id: Some(container),
                engine: request.provider.clone(),
                model: request.model.clone(),
            },
            &self.clock.now_iso(),
        )?)
    }

    /// Hooks that tee provider streams into the run's artifacts and append
    /// trace events to its events log.
    fn tee_hooks(&self, run: &RunHandle) -> RunnerHooks {
        let events_path = run.events_path();
        let stdout_path = run.artifacts_dir().join("spawned.stdout.log");
        let stderr_path = run.artifacts_dir().join("spawned.stderr.log");
        let mut stdout_file = open_append(&stdout_path);
        let mut stderr_file = open_append(&stderr_path);
        RunnerHooks {
            on_stdout: Some(Box::new(move |chunk: &str| {
                if let Some(file) = stdout_file.as_mut() {
                    let _ = file.write_all(chunk.as_bytes());
                }
            })),
            on_stderr: Some(Box::new(move |chunk: &str| {
                if let Some(file) = stderr_file.as_mut() {
                    let _ = file.write_all(chunk.as_bytes());
                }
            })),
            on_trace: Some(Box::new(move |event| {
                let _ = agx_store::append_ndjson_line(&events_path, &event);
            })),
        }
    }

    async fn update_local_status(&self, request: &IterationRequest, status: &str) {
        let partial = [("status".to_string(), serde_json::json!(status))].into_iter().collect();
        if let Err(error) =
            self.store.update_task_state(&request.project_slug, &request.task_slug, &partial)
        {
            tracing::warn!(error = %error, "failed to update local task status");
        }
    }

    async fn post_decision_comment(&self, task_id: &str, decision: &Decision) {
        let content = format!(
            "[verify] decision={}: {}\n\n{}",
            decision.decision, decision.summary, decision.explanation
        );
        if let Err(error) = self.sink.post_comment(task_id, &content).await {
            tracing::warn!(error = %error, "failed to post decision comment");
        }
    }

    fn index_entry(&self, run: &RunHandle) -> Option<RunIndexEntry> {
        match build_run_index_entry(run, self.config.artifact_sha_max_bytes) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(error = %error, "failed to build run index entry");
                None
            }
        }
    }

    /// Run the loop to a terminal decision or the iteration cap.
    pub async fn run(
        &self,
        request: &IterationRequest,
        watcher: &dyn CancellationWatcher,
    ) -> Result<IterationOutcome, EngineError> {
        let task_id = request.task.id.clone();
        let mut next_prompt: Option<String> = None;
        let mut last_run: Option<RunId> = None;
        let mut last_entry: Option<RunIndexEntry> = None;

        for iteration in 1..=request.max_iters.max(1) {
            abort_if_cancelled(watcher)?;
            tracing::info!(task = %request.task_slug, iteration, "starting iteration");

            // -- execute sub-run -------------------------------------------
            let container = RunId::new();
            last_run = Some(container);
            let mut execute = self.create_run(request, RunStage::Execute, container)?;

            let exec_prompt = execute_prompt(next_prompt.as_deref());
            let recorded_prompt =
                if iteration == 1 && !request.initial_prompt_context.is_empty() {
                    request.initial_prompt_context.as_str()
                } else {
                    exec_prompt.as_str()
                };
            execute.write_prompt(recorded_prompt, "execute", &self.clock.now_iso())?;

            let execute_output = self
                .run_execute_phase(request, &task_id, &exec_prompt, &execute, watcher)
                .await;
            let output_text = match execute_output {
                Ok(text) => text,
                Err(PhaseFailure::Cancelled { reason }) => {
                    execute.fail("cancelled", Some("cancelled"), &self.clock.now_iso())?;
                    return Err(EngineError::Cancelled { reason });
                }
                Err(PhaseFailure::Provider(message)) => {
                    execute.write_output(&format!("## Execute Error\n\n{message}\n"))?;
                    execute.fail(&message, Some("provider_error"), &self.clock.now_iso())?;
                    let decision =
                        Decision::failed(format!("Execute phase failed: {message}"));
                    self.update_local_status(request, "failed").await;
                    self.post_decision_comment(&task_id, &decision).await;
                    return Ok(IterationOutcome {
                        code: 1,
                        decision,
                        run_index_entry: self.index_entry(&execute),
                        last_run,
                    });
                }
            };
            execute.write_output(&format!("## Provider Output\n\n{output_text}"))?;

            // -- verify sub-run --------------------------------------------
            if let Err(reason) = check_watcher(watcher) {
                execute.fail("cancelled", Some("cancelled"), &self.clock.now_iso())?;
                return Err(EngineError::Cancelled { reason });
            }
            let mut verify = self.create_run(request, RunStage::Verify, container)?;
            let evidence = collect_evidence(&request.workdir).await;
            let prompt = verify_prompt(
                &request.task,
                &evidence,
                self.config.verify_prompt_max_chars,
            );
            verify.write_prompt(&prompt, "verify", &self.clock.now_iso())?;

            let mut hooks = self.tee_hooks(&verify);
            let invocation = ProviderInvocation {
                args: verify_args(&request.provider, request.model.as_deref(), &prompt),
                timeout: self.config.verify_timeout,
                label: format!("{} verify", request.provider),
            };
            let verifier = self.provider.run(invocation, &mut hooks, Some(watcher)).await;
            drop(hooks);

            let (stdout, stderr) = match verifier {
                Ok(output) => (output.stdout, output.stderr),
                Err(RunnerError::Cancelled { reason }) => {
                    verify.fail("cancelled", Some("cancelled"), &self.clock.now_iso())?;
                    execute.fail("cancelled", Some("cancelled"), &self.clock.now_iso())?;
                    return Err(EngineError::Cancelled { reason });
                }
                Err(error) => {
                    let message = error.to_string();
                    verify.write_output(&format!("## Verifier Error\n\n{message}\n"))?;
                    let decision = Decision::failed(format!("Verifier failed: {message}"));
                    verify.write_decision(&decision)?;
                    persist_iteration_artifacts(
                        &execute,
                        &verify,
                        &decision,
                        &evidence,
                        &self.clock.now_iso(),
                    );
                    verify.fail(&message, Some("verifier_error"), &self.clock.now_iso())?;
                    execute.fail(
                        "Verifier failed; see verify stage.",
                        Some("verifier_error"),
                        &self.clock.now_iso(),
                    )?;
                    self.update_local_status(request, "failed").await;
                    self.post_decision_comment(&task_id, &decision).await;
                    return Ok(IterationOutcome {
                        code: 1,
                        decision,
                        run_index_entry: self.index_entry(&verify),
                        last_run,
                    });
                }
            };
            verify.write_output(&stdout)?;

            // -- decision --------------------------------------------------
            let decision = parse_decision(&stdout, &stderr);
            let decision = enforce_stage_requirement(request.task.stage, decision, &evidence);
            verify.write_decision(&decision)?;
            persist_iteration_artifacts(
                &execute,
                &verify,
                &decision,
                &evidence,
                &self.clock.now_iso(),
            );

            let status = decision.decision.run_status();
            execute.finalize(
                status,
                "Execute phase completed; see verify stage for decision.",
                &self.clock.now_iso(),
            )?;
            verify.finalize(status, &decision.explanation, &self.clock.now_iso())?;

            last_entry = self.index_entry(&verify);
            let local_status = match decision.decision {
                agx_core::DecisionKind::Done => "done",
                agx_core::DecisionKind::Blocked => "blocked",
                agx_core::DecisionKind::NotDone => "running",
                agx_core::DecisionKind::Failed => "failed",
            };
            self.update_local_status(request, local_status).await;
            self.post_decision_comment(&task_id, &decision).await;

            if decision.decision.is_terminal() {
                return Ok(IterationOutcome {
                    code: decision.exit_code(),
                    decision,
                    run_index_entry: last_entry,
                    last_run,
                });
            }
            next_prompt = Some(augmented_next_prompt(&decision));
        }

        // Iteration cap reached without a terminal decision.
        let decision = normalize_decision(DecisionPayload {
            decision: Some("not_done".to_string()),
            explanation: Some(format!(
                "Reached max iterations ({}) without a terminal decision.",
                request.max_iters.max(1)
            )),
            ..Default::default()
        });
        Ok(IterationOutcome { code: 1, decision, run_index_entry: last_entry, last_run })
    }

    async fn run_execute_phase(
        &self,
        request: &IterationRequest,
        task_id: &str,
        exec_prompt: &str,
        execute: &RunHandle,
        watcher: &dyn CancellationWatcher,
    ) -> Result<String, PhaseFailure> {
        if request.swarm_providers.is_empty() {
            let mut hooks = self.tee_hooks(execute);
            let invocation = ProviderInvocation {
                args: execute_args(
                    &request.provider,
                    task_id,
                    request.model.as_deref(),
                    exec_prompt,
                ),
                timeout: self.config.provider_timeout,
                label: format!("{} execute", request.provider),
            };
            match self.provider.run(invocation, &mut hooks, Some(watcher)).await {
                Ok(output) => Ok(output.stdout),
                Err(RunnerError::Cancelled { reason }) => {
                    Err(PhaseFailure::Cancelled { reason })
                }
                Err(error) => Err(PhaseFailure::Provider(error.to_string())),
            }
        } else {
            let swarm = run_swarm_execute(
                &self.provider,
                &request.swarm_providers,
                task_id,
                request.model.as_deref(),
                exec_prompt,
                self.config.provider_timeout,
                Some(watcher),
            )
            .await;
            match swarm {
                Ok(output) if !output.combined.trim().is_empty() => {
                    for (provider, error) in &output.failures {
                        tracing::warn!(provider = %provider, error = %error, "swarm member failed");
                    }
                    Ok(output.combined)
                }
                Ok(output) => Err(PhaseFailure::Provider(format!(
                    "all swarm providers failed: {}",
                    output
                        .failures
                        .iter()
                        .map(|(p, e)| format!("{p}: {e}"))
                        .collect::<Vec<_>>()
                        .join("; ")
                ))),
                Err(RunnerError::Cancelled { reason }) => {
                    Err(PhaseFailure::Cancelled { reason })
                }
                Err(error) => Err(PhaseFailure::Provider(error.to_string())),
            }
        }
    }
}

enum PhaseFailure {
    Cancelled { reason: String },
    Provider(String),
}

fn abort_if_cancelled(watcher: &dyn CancellationWatcher) -> Result<(), EngineError> {
    check_watcher(watcher).map_err(|reason| EngineError::Cancelled { reason })
}

fn check_watcher(watcher: &dyn CancellationWatcher) -> Result<(), String> {
    match watcher.check() {
        Ok(()) => Ok(()),
        Err(RunnerError::Cancelled { reason }) => Err(reason),
        Err(other) => Err(other.to_string()),
    }
}

/// Parse the verifier's final JSON object (stdout, stderr fallback).
fn parse_decision(stdout: &str, stderr: &str) -> Decision {
    let value = parse_last_json_object(stdout).or_else(|| parse_last_json_object(stderr));
    match value.and_then(|v| serde_json::from_value::<DecisionPayload>(v).ok()) {
        Some(payload) => normalize_decision(payload),
        None => Decision::failed("Verifier returned invalid JSON."),
    }
}

fn open_append(path: &std::path::Path) -> Option<std::fs::File> {
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return None;
        }
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path).ok()
}

#[cfg(test)]
#[path = "iteration_tests.rs"]
mod tests;
