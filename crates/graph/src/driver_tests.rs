// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the tick driver

use super::*;
use crate::event::{BudgetType, GraphEvent, PendingEvent};
use crate::queue::MemoryTickQueue;
use crate::scheduler::SchedulerTick;
use crate::store::{GraphStore, MemoryGraphStore};
use crate::test_support::{single_node_graph, EPOCH};
use agx_core::FakeClock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

fn clock_at_epoch_plus(ms: u64) -> FakeClock {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_577_836_800_000 + ms);
    clock
}

/// pending → running on one tick, running → done on the next.
fn step_scheduler() -> Arc<dyn Scheduler> {
    Arc::new(|mut graph: Graph, now_iso: &str| {
        for node in graph.nodes.values_mut() {
            match node.status {
                NodeStatus::Pending => {
                    node.status = NodeStatus::Running;
                    node.started_at = Some(now_iso.to_string());
                    break;
                }
                NodeStatus::Running => {
                    node.status = NodeStatus::Done;
                    node.completed_at = Some(now_iso.to_string());
                    break;
                }
                _ => {}
            }
        }
        if graph.nodes.values().all(|n| n.status.is_terminal()) {
            graph.completed_at = Some(now_iso.to_string());
            graph.status = Some("completed".to_string());
        }
        SchedulerTick { graph, events: Vec::new() }
    })
}

fn runtime_with(
    store: Arc<dyn GraphStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: FakeClock,
) -> (Arc<GraphRuntime<FakeClock>>, Arc<MemoryTickQueue>) {
    let queue = Arc::new(MemoryTickQueue::new());
    let runtime = GraphRuntime::new(
        store,
        queue.clone(),
        scheduler,
        clock,
        TickDriverConfig {
            max_conflict_retries: 3,
            conflict_retry_delay: Duration::from_millis(1),
        },
    );
    (runtime, queue)
}

async fn drain(runtime: &GraphRuntime<FakeClock>) -> usize {
    let mut processed = 0;
    while runtime.process_next().await.unwrap() {
        processed += 1;
    }
    processed
}

// -- S3: resume across restart ----------------------------------------------

#[tokio::test]
async fn resume_after_restart_reaches_the_same_terminal_state() {
    let clock = clock_at_epoch_plus(1000);
    let store: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new(clock.clone()));

    let mut g1 = single_node_graph(NodeStatus::Pending);
    g1.id = GraphId::from_string("gph-g1");
    let mut g2 = single_node_graph(NodeStatus::Pending);
    g2.id = GraphId::from_string("gph-g2");
    store.create_graph(&g1).await.unwrap();
    store.create_graph(&g2).await.unwrap();

    // Runtime A: recovery enqueues both, drain exactly two jobs, stop.
    let (runtime_a, queue_a) = runtime_with(store.clone(), step_scheduler(), clock.clone());
    assert_eq!(runtime_a.enqueue_recovery_ticks().await.unwrap(), 2);
    runtime_a.process_next().await.unwrap();
    runtime_a.process_next().await.unwrap();
    queue_a.stop();

    // Mid-state: both nodes running.
    for id in [&g1.id, &g2.id] {
        let graph = store.get_graph(id).await.unwrap().unwrap();
        assert_eq!(graph.nodes["n1"].status, NodeStatus::Running);
    }

    // Runtime B against the same store: one tick per in-progress graph,
    // drained to idle.
    let (runtime_b, _queue_b) = runtime_with(store.clone(), step_scheduler(), clock.clone());
    assert_eq!(runtime_b.enqueue_recovery_ticks().await.unwrap(), 2);
    drain(&runtime_b).await;

    for id in [&g1.id, &g2.id] {
        let graph = store.get_graph(id).await.unwrap().unwrap();
        assert_eq!(graph.nodes["n1"].status, NodeStatus::Done);
        assert!(graph.graph_version >= 3, "version {}", graph.graph_version);
        assert!(graph.completed_at.is_some());
    }
}

// -- S4: conflict retry ------------------------------------------------------

struct ConflictInjector {
    inner: Arc<dyn GraphStore>,
    remaining: AtomicU32,
    injected: AtomicU32,
}

#[async_trait]
impl GraphStore for ConflictInjector {
    async fn create_graph(&self, graph: &Graph) -> Result<(), GraphError> {
        self.inner.create_graph(graph).await
    }

    async fn get_graph(&self, id: &GraphId) -> Result<Option<Graph>, GraphError> {
        self.inner.get_graph(id).await
    }

    async fn list_in_progress_graphs(&self) -> Result<Vec<Graph>, GraphError> {
        self.inner.list_in_progress_graphs().await
    }

    async fn replace_graph(
        &self,
        id: &GraphId,
        next: &Graph,
        if_match_graph_version: u64,
    ) -> Result<Graph, GraphError> {
        if self.remaining.load(Ordering::SeqCst) > 0 {
            self.remaining.fetch_sub(1, Ordering::SeqCst);
            self.injected.fetch_add(1, Ordering::SeqCst);
            // Simulate a concurrent writer: re-set the current graph,
            // bumping the stored version, then report the conflict.
            let current = self
                .inner
                .get_graph(id)
                .await?
                .ok_or(GraphError::NotFound(*id))?;
            let version = current.graph_version;
            self.inner.replace_graph(id, &current, version).await?;
            return Err(GraphError::VersionConflict {
                graph_id: *id,
                expected: if_match_graph_version,
                actual: version + 1,
            });
        }
        self.inner.replace_graph(id, next, if_match_graph_version).await
    }

    async fn append_event(
        &self,
        id: &GraphId,
        event: &crate::GraphEventRecord,
    ) -> Result<(), GraphError> {
        self.inner.append_event(id, event).await
    }

    async fn get_events(&self, id: &GraphId) -> Result<Vec<crate::GraphEventRecord>, GraphError> {
        self.inner.get_events(id).await
    }
}

#[tokio::test]
async fn conflict_is_retried_and_mutation_is_not_lost() {
    let clock = clock_at_epoch_plus(1000);
    let inner: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new(clock.clone()));
    let store = Arc::new(ConflictInjector {
        inner: inner.clone(),
        remaining: AtomicU32::new(1),
        injected: AtomicU32::new(0),
    });

    // Single tick takes the node straight to done.
    let scheduler: Arc<dyn Scheduler> = Arc::new(|mut graph: Graph, now_iso: &str| {
        for node in graph.nodes.values_mut() {
            node.status = NodeStatus::Done;
            node.completed_at = Some(now_iso.to_string());
        }
        graph.completed_at = Some(now_iso.to_string());
        SchedulerTick { graph, events: Vec::new() }
    });

    let graph = single_node_graph(NodeStatus::Pending);
    inner.create_graph(&graph).await.unwrap();

    let (runtime, _queue) = runtime_with(store.clone(), scheduler, clock);
    runtime.enqueue_recovery_ticks().await.unwrap();
    drain(&runtime).await;

    let final_graph = inner.get_graph(&graph.id).await.unwrap().unwrap();
    assert_eq!(final_graph.nodes["n1"].status, NodeStatus::Done);
    assert_eq!(store.injected.load(Ordering::SeqCst), 1);
    // Original + injected bump + successful retry.
    assert!(final_graph.graph_version >= 3, "version {}", final_graph.graph_version);
}

#[tokio::test]
async fn conflict_exhaustion_propagates() {
    let clock = clock_at_epoch_plus(1000);
    let inner: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new(clock.clone()));
    let store = Arc::new(ConflictInjector {
        inner: inner.clone(),
        remaining: AtomicU32::new(u32::MAX),
        injected: AtomicU32::new(0),
    });
    let graph = single_node_graph(NodeStatus::Pending);
    inner.create_graph(&graph).await.unwrap();

    let (runtime, _queue) = runtime_with(store.clone(), step_scheduler(), clock);
    runtime.enqueue_recovery_ticks().await.unwrap();
    let error = runtime.process_next().await.unwrap_err();
    assert!(error.is_version_conflict());
    // Initial attempt plus max_conflict_retries.
    assert_eq!(store.injected.load(Ordering::SeqCst), 4);
}

// -- S5: budget + node_status events -----------------------------------------

#[tokio::test]
async fn budget_and_status_events_are_persisted_together() {
    let clock = clock_at_epoch_plus(1000);
    let store: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new(clock.clone()));

    let scheduler: Arc<dyn Scheduler> = Arc::new(|mut graph: Graph, now_iso: &str| {
        let mut events = Vec::new();
        if let Some(node) = graph.nodes.get_mut("n1") {
            if node.status == NodeStatus::Pending {
                node.status = NodeStatus::Running;
                node.started_at = Some(now_iso.to_string());
                events.push(PendingEvent::from(GraphEvent::BudgetConsumed {
                    budget_type: BudgetType::Verify,
                    remaining: 2,
                    trigger_node_id: "n1".to_string(),
                }));
            }
        }
        SchedulerTick { graph, events }
    });

    let graph = single_node_graph(NodeStatus::Pending);
    store.create_graph(&graph).await.unwrap();
    let (runtime, _queue) = runtime_with(store.clone(), scheduler, clock);
    runtime.enqueue_recovery_ticks().await.unwrap();
    runtime.process_next().await.unwrap();

    let events = store.get_events(&graph.id).await.unwrap();
    assert_eq!(events.len(), 2);
    match &events[0].event {
        GraphEvent::NodeStatus { from_status, to_status, .. } => {
            assert_eq!(*from_status, NodeStatus::Pending);
            assert_eq!(*to_status, NodeStatus::Running);
        }
        other => panic!("expected node_status first, got {other:?}"),
    }
    match &events[1].event {
        GraphEvent::BudgetConsumed { budget_type, remaining, trigger_node_id } => {
            assert_eq!(*budget_type, BudgetType::Verify);
            assert_eq!(*remaining, 2);
            assert_eq!(trigger_node_id, "n1");
        }
        other => panic!("expected budget_consumed, got {other:?}"),
    }
    assert!(!events[1].timestamp.is_empty());
    assert_eq!(events[1].graph_id, graph.id);
}

// -- S6: graph timeout --------------------------------------------------------

#[tokio::test]
async fn graph_timeout_fails_nodes_without_invoking_the_scheduler() {
    // Two hours past the fixture's createdAt; policy allows 500 ms.
    let clock = clock_at_epoch_plus(2 * 60 * 60 * 1000);
    let store: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new(clock.clone()));

    let invocations = Arc::new(AtomicU32::new(0));
    let counter = invocations.clone();
    let scheduler: Arc<dyn Scheduler> = Arc::new(move |graph: Graph, _now_iso: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        SchedulerTick { graph, events: Vec::new() }
    });

    let mut graph = single_node_graph(NodeStatus::Pending);
    graph.created_at = EPOCH.to_string();
    graph.policy.graph_timeout_ms = 500;
    store.create_graph(&graph).await.unwrap();

    let (runtime, queue) = runtime_with(store.clone(), scheduler, clock);
    runtime.enqueue_recovery_ticks().await.unwrap();
    runtime.process_next().await.unwrap();

    let final_graph = store.get_graph(&graph.id).await.unwrap().unwrap();
    assert!(final_graph.timed_out_at.is_some());
    assert!(final_graph.completed_at.is_some());
    assert_eq!(final_graph.status.as_deref(), Some("timed_out"));
    assert_eq!(final_graph.nodes["n1"].status, NodeStatus::Failed);
    assert_eq!(final_graph.nodes["n1"].error.as_deref(), Some("graph_timeout"));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    // At least one node_status event (pending → failed) was persisted.
    let events = store.get_events(&graph.id).await.unwrap();
    assert!(events.iter().any(|record| matches!(
        &record.event,
        GraphEvent::NodeStatus { to_status: NodeStatus::Failed, .. }
    )));

    // Quiescent: nothing was re-enqueued and later ticks are no-ops.
    assert!(queue.is_empty());
    runtime.handle_tick(&TickJob { graph_id: graph.id }).await.unwrap();
    let unchanged = store.get_graph(&graph.id).await.unwrap().unwrap();
    assert_eq!(unchanged.graph_version, final_graph.graph_version);
}

// -- worker loop --------------------------------------------------------------

#[tokio::test]
async fn started_runtime_drives_graphs_to_completion() {
    let clock = clock_at_epoch_plus(1000);
    let store: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new(clock.clone()));
    let (runtime, _queue) = runtime_with(store.clone(), step_scheduler(), clock);

    let graph = single_node_graph(NodeStatus::Pending);
    runtime.create_graph(&graph).await.unwrap();
    runtime.start().await.unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let current = store.get_graph(&graph.id).await.unwrap().unwrap();
        if current.completed_at.is_some() {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "graph never completed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    runtime.stop().await;
}
