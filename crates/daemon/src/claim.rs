// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production claim handler: mirror, lock, iterate, complete.

use crate::pool::{ClaimHandler, ClaimSource};
use crate::watch::TaskCancelWatcher;
use crate::AgxHome;
use agx_client::{CompletionRequest, TaskServiceClient};
use agx_core::{build_cloud_task_terminal_patch, Clock, Config, SystemClock, Task};
use agx_engine::{
    CliProviderAdapter, EngineError, IterationEngine, IterationRequest, TaskSink,
};
use agx_runner::{CancellationWatcher, ProcessManager};
use agx_store::{ArtifactStore, CreateTask, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Task service claim source.
pub struct ServiceClaimSource {
    pub client: TaskServiceClient,
}

#[async_trait]
impl ClaimSource for ServiceClaimSource {
    async fn poll(&self) -> Result<Option<Task>, String> {
        self.client.poll_queue().await.map_err(|e| e.to_string())
    }
}

/// Engine sink posting comments through the task service.
#[derive(Clone)]
pub struct ClientSink {
    client: TaskServiceClient,
}

#[async_trait]
impl TaskSink for ClientSink {
    async fn post_comment(
        &self,
        task_id: &str,
        content: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.client.post_comment(task_id, content).await?;
        Ok(())
    }
}

/// Everything a claim needs, shared across workers.
pub struct ClaimContext {
    pub client: TaskServiceClient,
    pub store: ArtifactStore,
    pub manager: ProcessManager,
    pub config: Config,
    pub home: Arc<AgxHome>,
    /// Repository the iteration engine verifies against.
    pub workdir: std::path::PathBuf,
}

/// Production [`ClaimHandler`]: one full iteration-engine invocation per
/// claim, under the local task lock.
pub struct DaemonClaimHandler {
    context: ClaimContext,
}

impl DaemonClaimHandler {
    pub fn new(context: ClaimContext) -> Self {
        Self { context }
    }

    /// Mirror the cloud task locally, returning (project_slug, task_slug).
    fn mirror_task(&self, task: &Task) -> Result<(String, String), StoreError> {
        let store = &self.context.store;
        let clock = SystemClock;
        let project_name = if task.project.name.is_empty() {
            "default"
        } else {
            &task.project.name
        };
        let project_slug = store.select_project_slug(&task.project.id, project_name)?;
        let partial = [
            ("cloud_project_id".to_string(), serde_json::json!(task.project.id)),
            ("name".to_string(), serde_json::json!(project_name)),
        ]
        .into_iter()
        .collect();
        store.write_project_state(&project_slug, &partial)?;

        let task_slug = task.slug.clone();
        if store.read_task_state(&project_slug, &task_slug)?.is_none() {
            store.create_task(
                &project_slug,
                CreateTask {
                    user_request: task.title.clone(),
                    goal: task.content.clone(),
                    task_slug: task_slug.clone(),
                },
                &clock.now_iso(),
            )?;
        }
        let id_patch = [
            ("cloud_task_id".to_string(), serde_json::json!(task.id)),
            ("updated_at".to_string(), serde_json::json!(clock.now_iso())),
        ]
        .into_iter()
        .collect();
        store.update_task_state(&project_slug, &task_slug, &id_patch)?;
        store.write_working_set(&project_slug, &task_slug, task)?;
        Ok((project_slug, task_slug))
    }

    fn iteration_request(
        &self,
        task: &Task,
        project_slug: String,
        task_slug: String,
    ) -> IterationRequest {
        let provider = task.provider.clone().unwrap_or_else(|| "claude".to_string());
        // Swarm tasks list their providers comma-separated.
        let swarm_providers = if task.swarm {
            provider.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
        } else {
            Vec::new()
        };
        let primary = swarm_providers.first().cloned().unwrap_or(provider);
        IterationRequest {
            task: task.clone(),
            project_slug,
            task_slug,
            provider: primary,
            model: task.model.clone(),
            swarm_providers,
            initial_prompt_context: format!("# {}\n\n{}", task.title, task.content),
            max_iters: self.context.config.max_iters(task.swarm),
            workdir: self.context.workdir.clone(),
        }
    }

    async fn complete(&self, task: &Task, outcome: &agx_engine::IterationOutcome) {
        let clock = SystemClock;
        let request = CompletionRequest {
            task_id: task.id.clone(),
            log: outcome.decision.summary.clone(),
            decision: outcome.decision.decision,
            final_result: outcome.decision.final_result.clone(),
            explanation: outcome.decision.explanation.clone(),
            artifact_path: None,
            artifact_host: None,
            artifact_key: None,
            run_entry: outcome.run_index_entry.clone(),
        };
        match self.context.client.complete(&request).await {
            Ok(response) => {
                self.context.home.audit(&format!(
                    "completed task={} decision={} new_stage={}",
                    task.slug, outcome.decision.decision, response.new_stage
                ));
                // Repair any stage/status drift the completion left behind.
                let patch = build_cloud_task_terminal_patch(
                    outcome.decision.decision,
                    &response.new_stage,
                    &clock.now_iso(),
                );
                if let Some(patch) = patch {
                    match serde_json::to_value(&patch) {
                        Ok(value) => {
                            if let Err(error) =
                                self.context.client.patch_task(&task.id, &value).await
                            {
                                tracing::warn!(error = %error, "terminal patch failed");
                            }
                        }
                        Err(error) => tracing::warn!(error = %error, "terminal patch encode failed"),
                    }
                }
            }
            Err(error) => {
                tracing::error!(task = %task.slug, error = %error, "completion post failed");
            }
        }
    }
}

#[async_trait]
impl ClaimHandler for DaemonClaimHandler {
    async fn handle(&self, task: Task, stop: &CancellationToken) {
        let (project_slug, task_slug) = match self.mirror_task(&task) {
            Ok(slugs) => slugs,
            Err(error) => {
                tracing::error!(task = %task.slug, error = %error, "failed to mirror task");
                return;
            }
        };

        // One worker per (project, task) on this machine. A held lock
        // means another worker (or daemon) owns it; skip the claim.
        let task_root = self.context.store.task_dir(&project_slug, &task_slug);
        let lock = match self.context.store.acquire_task_lock(&task_root, false) {
            Ok(lock) => lock,
            Err(StoreError::LockHeld { pid, .. }) => {
                tracing::warn!(task = %task_slug, holder = pid, "task lock held; skipping claim");
                return;
            }
            Err(error) => {
                tracing::error!(task = %task_slug, error = %error, "task lock failed");
                return;
            }
        };

        let watcher = TaskCancelWatcher::new(
            self.context.client.clone(),
            task.id.clone(),
            stop.clone(),
        );
        watcher.start_polling();

        let engine = IterationEngine::new(
            self.context.store.clone(),
            CliProviderAdapter::new(
                self.context.manager.clone(),
                self.context.config.provider_retries,
            ),
            ClientSink { client: self.context.client.clone() },
            SystemClock,
            self.context.config.clone(),
        );
        let request = self.iteration_request(&task, project_slug, task_slug);

        match engine.run(&request, watcher.as_ref()).await {
            Ok(outcome) => {
                tracing::info!(
                    task = %task.slug,
                    decision = %outcome.decision.decision,
                    code = outcome.code,
                    "iteration engine finished"
                );
                self.complete(&task, &outcome).await;
            }
            Err(EngineError::Cancelled { reason }) => {
                // Cancellation posts no completion.
                self.context.home.audit(&format!("cancelled task={} reason={reason}", task.slug));
                tracing::info!(task = %task.slug, reason = %reason, "claim cancelled");
            }
            Err(error) => {
                tracing::error!(task = %task.slug, error = %error, "iteration engine failed");
            }
        }

        watcher.destroy();
        lock.release();
    }
}
