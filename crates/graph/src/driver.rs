// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tick driver: pulls tick jobs, invokes the pure scheduler, persists
//! under the version guard, and derives durable events.

use crate::event::derive_events;
use crate::model::{Graph, GraphId, NodeStatus};
use crate::queue::{TickJob, TickQueue};
use crate::scheduler::Scheduler;
use crate::store::GraphStore;
use crate::GraphError;
use agx_core::Clock;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Tick driver tuning.
#[derive(Debug, Clone)]
pub struct TickDriverConfig {
    /// Version-conflict retries before the error propagates to the queue.
    pub max_conflict_retries: u32,
    /// Base delay between conflict retries; multiplied by the attempt number.
    pub conflict_retry_delay: Duration,
}

impl Default for TickDriverConfig {
    fn default() -> Self {
        Self { max_conflict_retries: 3, conflict_retry_delay: Duration::from_millis(50) }
    }
}

/// Durable, recovery-safe driver around a pure scheduler.
pub struct GraphRuntime<C: Clock> {
    store: Arc<dyn GraphStore>,
    queue: Arc<dyn TickQueue>,
    scheduler: Arc<dyn Scheduler>,
    clock: C,
    config: TickDriverConfig,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}

fn tick_expiry_seconds(graph: &Graph) -> u64 {
    (graph.policy.node_timeout_ms.div_ceil(1000)).max(1)
}

impl<C: Clock + 'static> GraphRuntime<C> {
    pub fn new(
        store: Arc<dyn GraphStore>,
        queue: Arc<dyn TickQueue>,
        scheduler: Arc<dyn Scheduler>,
        clock: C,
        config: TickDriverConfig,
    ) -> Arc<Self> {
        Arc::new(Self { store, queue, scheduler, clock, config, worker: Mutex::new(None) })
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Create a graph and schedule its first tick.
    pub async fn create_graph(&self, graph: &Graph) -> Result<(), GraphError> {
        self.store.create_graph(graph).await?;
        self.enqueue_tick(graph).await?;
        Ok(())
    }

    async fn enqueue_tick(&self, graph: &Graph) -> Result<bool, GraphError> {
        self.queue
            .send(
                TickJob { graph_id: graph.id },
                graph.id.as_str(),
                tick_expiry_seconds(graph),
            )
            .await
    }

    /// Start the worker and enqueue one tick per in-progress graph, so a
    /// restart resumes every non-terminal graph.
    pub async fn start(self: &Arc<Self>) -> Result<(), GraphError> {
        let runtime = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(job) = runtime.queue.recv().await {
                let graph_id = job.graph_id;
                if let Err(error) = runtime.handle_tick(&job).await {
                    tracing::error!(graph_id = %graph_id, error = %error, "tick failed; redelivering");
                    tokio::time::sleep(runtime.config.conflict_retry_delay).await;
                    let _ = self_resend(&runtime, graph_id).await;
                }
            }
        });
        *self.worker.lock() = Some(handle);
        self.enqueue_recovery_ticks().await?;
        Ok(())
    }

    /// Enqueue one tick per in-progress graph.
    pub async fn enqueue_recovery_ticks(&self) -> Result<usize, GraphError> {
        let graphs = self.store.list_in_progress_graphs().await?;
        let mut enqueued = 0;
        for graph in &graphs {
            if self.enqueue_tick(graph).await? {
                enqueued += 1;
            }
        }
        Ok(enqueued)
    }

    /// Halt the queue; the in-flight tick finishes its current attempt.
    pub async fn stop(&self) {
        self.queue.stop();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Process one pending job without waiting. Test and drain helper.
    pub async fn process_next(&self) -> Result<bool, GraphError> {
        match self.queue.try_recv() {
            Some(job) => {
                self.handle_tick(&job).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Handle one tick job, retrying version conflicts with linear backoff.
    pub async fn handle_tick(&self, job: &TickJob) -> Result<(), GraphError> {
        let mut attempt: u32 = 0;
        loop {
            match self.tick_once(&job.graph_id).await {
                Ok(()) => return Ok(()),
                Err(error)
                    if error.is_version_conflict()
                        && attempt < self.config.max_conflict_retries =>
                {
                    attempt += 1;
                    tracing::warn!(
                        graph_id = %job.graph_id,
                        attempt,
                        error = %error,
                        "graph version conflict; retrying"
                    );
                    tokio::time::sleep(self.config.conflict_retry_delay * attempt).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn tick_once(&self, graph_id: &GraphId) -> Result<(), GraphError> {
        // 1. Load; absent graphs drop the job.
        let Some(current) = self.store.get_graph(graph_id).await? else {
            tracing::warn!(graph_id = %graph_id, "tick for unknown graph dropped");
            return Ok(());
        };
        if current.is_quiescent() {
            return Ok(());
        }

        let now = self.clock.now_utc();
        let now_iso = self.clock.now_iso();

        // 2. Graph timeout short-circuits the scheduler.
        if graph_timed_out(&current, now) {
            let next = timed_out_graph(&current, &now_iso);
            let events = derive_events(&current, &next, Vec::new(), &now_iso);
            self.store.replace_graph(graph_id, &next, current.graph_version).await?;
            for event in &events {
                self.store.append_event(graph_id, event).await?;
            }
            tracing::info!(graph_id = %graph_id, "graph timed out");
            return Ok(());
        }

        // 3. Pure scheduler over a deep clone.
        let tick = self.scheduler.tick(current.clone(), &now_iso);

        // 4. Events: status symmetric-diff union scheduler budget events.
        let events = derive_events(&current, &tick.graph, tick.events, &now_iso);

        // 5. Guarded write, then events in order, then re-enqueue while
        //    the graph is still in progress.
        let persisted = self
            .store
            .replace_graph(graph_id, &tick.graph, current.graph_version)
            .await?;
        for event in &events {
            self.store.append_event(graph_id, event).await?;
        }
        if persisted.is_in_progress() {
            self.enqueue_tick(&persisted).await?;
        }
        Ok(())
    }
}

async fn self_resend<C: Clock + 'static>(
    runtime: &Arc<GraphRuntime<C>>,
    graph_id: GraphId,
) -> Result<bool, GraphError> {
    match runtime.store.get_graph(&graph_id).await? {
        Some(graph) => runtime.enqueue_tick(&graph).await,
        None => Ok(false),
    }
}

fn graph_timed_out(graph: &Graph, now: DateTime<Utc>) -> bool {
    let timeout_ms = graph.policy.graph_timeout_ms;
    if timeout_ms == 0 {
        return false;
    }
    match parse_iso(graph.timeout_anchor()) {
        Some(anchor) => (now - anchor).num_milliseconds() >= timeout_ms as i64,
        None => false,
    }
}

fn timed_out_graph(current: &Graph, now_iso: &str) -> Graph {
    let mut next = current.clone();
    next.timed_out_at = Some(now_iso.to_string());
    next.completed_at = Some(now_iso.to_string());
    next.status = Some("timed_out".to_string());
    for node in next.nodes.values_mut() {
        if !node.status.is_terminal() {
            node.status = NodeStatus::Failed;
            node.error = Some("graph_timeout".to_string());
            node.completed_at = Some(now_iso.to_string());
        }
    }
    next
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
