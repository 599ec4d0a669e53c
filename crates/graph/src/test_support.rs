// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for graph tests.

use crate::model::{
    DoneCriteria, ExecutionPolicy, Graph, GraphId, GraphMode, Node, NodeStatus, NodeType,
};
use std::collections::BTreeMap;

pub(crate) const EPOCH: &str = "2020-01-01T00:00:00.000Z";

/// A graph with one work node (`n1`) in the given status.
pub(crate) fn single_node_graph(status: NodeStatus) -> Graph {
    let mut nodes = BTreeMap::new();
    let mut node = Node::new(NodeType::Work);
    node.status = status;
    nodes.insert("n1".to_string(), node);
    Graph {
        id: GraphId::from_string("gph-test"),
        task_id: "task-1".to_string(),
        graph_version: 1,
        mode: GraphMode::Simple,
        nodes,
        edges: Vec::new(),
        policy: ExecutionPolicy::default(),
        done_criteria: DoneCriteria::default(),
        created_at: EPOCH.to_string(),
        updated_at: EPOCH.to_string(),
        started_at: None,
        completed_at: None,
        timed_out_at: None,
        status: None,
    }
}
