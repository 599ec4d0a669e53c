// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution graph model.
//!
//! Graphs persist as camelCase JSON. `graph_version` strictly increases on
//! every successful write; a graph with `timed_out_at` or `completed_at`
//! set is quiescent and no further scheduler mutation is valid.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

agx_core::define_id! {
    /// Unique identifier for an execution graph.
    pub struct GraphId("gph-");
}

/// Graph execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraphMode {
    Simple,
    Project,
}

/// Node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Work,
    Gate,
    Fork,
    Join,
    Conditional,
}

/// Node execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    AwaitingHuman,
    Done,
    Passed,
    Failed,
    Blocked,
    Skipped,
}

agx_core::simple_display! {
    NodeStatus {
        Pending => "pending",
        Running => "running",
        AwaitingHuman => "awaiting_human",
        Done => "done",
        Passed => "passed",
        Failed => "failed",
        Blocked => "blocked",
        Skipped => "skipped",
    }
}

impl NodeStatus {
    /// Terminal node statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Passed | Self::Failed | Self::Skipped)
    }
}

/// Work-node retry policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default)]
    pub attempts: u32,
}

/// One node of an execution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Work nodes: retry policy and output object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Gate nodes: verification strategy and result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Conditional nodes: expression, input binding, branches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, rename = "then", skip_serializing_if = "Option::is_none")]
    pub then_branch: Option<String>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    pub else_branch: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Minimal node of the given type in `pending`.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            status: NodeStatus::Pending,
            deps: Vec::new(),
            started_at: None,
            completed_at: None,
            error: None,
            retry: None,
            output: None,
            verification: None,
            result: None,
            expression: None,
            input: None,
            then_branch: None,
            else_branch: None,
            extra: Map::new(),
        }
    }
}

/// Edge kind: `hard` edges gate readiness, `soft` edges only order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Hard,
    Soft,
}

impl Default for EdgeType {
    fn default() -> Self {
        Self::Hard
    }
}

/// When an edge propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCondition {
    OnSuccess,
    OnFailure,
    Always,
}

impl Default for EdgeCondition {
    fn default() -> Self {
        Self::OnSuccess
    }
}

/// One edge of an execution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default)]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub condition: EdgeCondition,
    /// Optional data mapping applied when the edge fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Scheduling priority mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityMode {
    Fifo,
    CriticalPath,
    ShortestFirst,
}

impl Default for PriorityMode {
    fn default() -> Self {
        Self::Fifo
    }
}

/// A consumable budget with its initial allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBudget {
    #[serde(default)]
    pub remaining: u32,
    #[serde(default)]
    pub initial: u32,
}

/// Graph execution policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPolicy {
    #[serde(default)]
    pub replan_budget: ExecutionBudget,
    #[serde(default)]
    pub verify_budget: ExecutionBudget,
    #[serde(default)]
    pub max_concurrent_auto_checks: u32,
    #[serde(default)]
    pub immutable_required_gates: bool,
    #[serde(default)]
    pub max_concurrent: u32,
    #[serde(default)]
    pub priority_mode: PriorityMode,
    /// 0 disables the per-node timeout.
    #[serde(default)]
    pub node_timeout_ms: u64,
    /// 0 disables the graph timeout.
    #[serde(default)]
    pub graph_timeout_ms: u64,
}

/// Declarative completion criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneCriteria {
    #[serde(default)]
    pub all_required_gates_passed: bool,
    #[serde(default)]
    pub no_runnable_or_pending_work: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_sink_node_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_criteria: Option<Value>,
}

/// An execution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub id: GraphId,
    pub task_id: String,
    /// Monotonic: strictly increases on every successful write.
    pub graph_version: u64,
    pub mode: GraphMode,
    /// BTreeMap for stable iteration order across ticks.
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub policy: ExecutionPolicy,
    #[serde(default)]
    pub done_criteria: DoneCriteria,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timed_out_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Graph {
    /// Quiescent graphs accept no further scheduler mutation.
    pub fn is_quiescent(&self) -> bool {
        self.completed_at.is_some() || self.timed_out_at.is_some()
    }

    /// In progress: no terminal timestamp and at least one node still in a
    /// non-terminal, non-idle status.
    pub fn is_in_progress(&self) -> bool {
        !self.is_quiescent()
            && self.nodes.values().any(|n| {
                matches!(
                    n.status,
                    NodeStatus::Pending
                        | NodeStatus::Running
                        | NodeStatus::AwaitingHuman
                        | NodeStatus::Blocked
                )
            })
    }

    /// The instant the graph timeout measures from.
    pub fn timeout_anchor(&self) -> &str {
        self.started_at.as_deref().unwrap_or_else(|| {
            if self.created_at.is_empty() {
                &self.updated_at
            } else {
                &self.created_at
            }
        })
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
