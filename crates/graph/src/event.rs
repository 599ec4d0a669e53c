// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph events, derived deterministically from state deltas.

use crate::model::{Graph, GraphId, NodeStatus};
use serde::{Deserialize, Serialize};

/// Which budget a `budget_consumed` event drew from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    Replan,
    Verify,
}

/// Graph event body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum GraphEvent {
    #[serde(rename = "node_status", rename_all = "camelCase")]
    NodeStatus { node_id: String, from_status: NodeStatus, to_status: NodeStatus },

    #[serde(rename = "budget_consumed", rename_all = "camelCase")]
    BudgetConsumed { budget_type: BudgetType, remaining: u32, trigger_node_id: String },
}

/// Durable event record: body plus graph id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEventRecord {
    #[serde(flatten)]
    pub event: GraphEvent,
    pub graph_id: GraphId,
    pub timestamp: String,
}

/// Scheduler-emitted event, possibly missing its timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub event: GraphEvent,
    pub timestamp: Option<String>,
}

impl From<GraphEvent> for PendingEvent {
    fn from(event: GraphEvent) -> Self {
        Self { event, timestamp: None }
    }
}

/// Derive the durable event records for one tick.
///
/// `node_status` events are synthesized for every node whose status
/// differs between `pre` and `post` (the symmetric status diff, no
/// duplicates), then unioned with the scheduler's own events, whose
/// missing timestamps are stamped with `now_iso`.
pub fn derive_events(
    pre: &Graph,
    post: &Graph,
    scheduler_events: Vec<PendingEvent>,
    now_iso: &str,
) -> Vec<GraphEventRecord> {
    let mut records = Vec::new();
    for (node_id, post_node) in &post.nodes {
        let Some(pre_node) = pre.nodes.get(node_id) else {
            continue;
        };
        if pre_node.status != post_node.status {
            records.push(GraphEventRecord {
                event: GraphEvent::NodeStatus {
                    node_id: node_id.clone(),
                    from_status: pre_node.status,
                    to_status: post_node.status,
                },
                graph_id: post.id,
                timestamp: now_iso.to_string(),
            });
        }
    }
    for pending in scheduler_events {
        records.push(GraphEventRecord {
            event: pending.event,
            graph_id: post.id,
            timestamp: pending.timestamp.unwrap_or_else(|| now_iso.to_string()),
        });
    }
    records
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
