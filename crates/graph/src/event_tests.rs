// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for graph event derivation

use super::*;
use crate::test_support::single_node_graph;
use crate::NodeStatus;

const NOW: &str = "2020-01-01T00:00:01.000Z";

#[test]
fn status_change_produces_one_event() {
    let pre = single_node_graph(NodeStatus::Pending);
    let post = single_node_graph(NodeStatus::Running);
    let records = derive_events(&pre, &post, Vec::new(), NOW);
    assert_eq!(records.len(), 1);
    match &records[0].event {
        GraphEvent::NodeStatus { node_id, from_status, to_status } => {
            assert_eq!(node_id, "n1");
            assert_eq!(*from_status, NodeStatus::Pending);
            assert_eq!(*to_status, NodeStatus::Running);
        }
        other => panic!("expected node_status, got {other:?}"),
    }
    assert_eq!(records[0].timestamp, NOW);
    assert_eq!(records[0].graph_id, post.id);
}

#[test]
fn unchanged_status_produces_no_events() {
    let graph = single_node_graph(NodeStatus::Running);
    assert!(derive_events(&graph, &graph.clone(), Vec::new(), NOW).is_empty());
}

#[test]
fn scheduler_events_are_stamped_and_unioned() {
    let pre = single_node_graph(NodeStatus::Pending);
    let post = single_node_graph(NodeStatus::Running);
    let budget = PendingEvent::from(GraphEvent::BudgetConsumed {
        budget_type: BudgetType::Verify,
        remaining: 2,
        trigger_node_id: "n1".to_string(),
    });
    let records = derive_events(&pre, &post, vec![budget], NOW);
    assert_eq!(records.len(), 2);
    let budget_record = &records[1];
    assert!(matches!(budget_record.event, GraphEvent::BudgetConsumed { .. }));
    assert_eq!(budget_record.timestamp, NOW);
    assert_eq!(budget_record.graph_id, post.id);
}

#[test]
fn scheduler_timestamps_are_preserved() {
    let graph = single_node_graph(NodeStatus::Running);
    let stamped = PendingEvent {
        event: GraphEvent::BudgetConsumed {
            budget_type: BudgetType::Replan,
            remaining: 1,
            trigger_node_id: "n1".to_string(),
        },
        timestamp: Some("2019-12-31T23:59:59.000Z".to_string()),
    };
    let records = derive_events(&graph, &graph.clone(), vec![stamped], NOW);
    assert_eq!(records[0].timestamp, "2019-12-31T23:59:59.000Z");
}

#[test]
fn record_serializes_flat_with_event_type() {
    let record = GraphEventRecord {
        event: GraphEvent::NodeStatus {
            node_id: "n1".to_string(),
            from_status: NodeStatus::Pending,
            to_status: NodeStatus::Running,
        },
        graph_id: crate::GraphId::from_string("gph-x"),
        timestamp: NOW.to_string(),
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["eventType"], "node_status");
    assert_eq!(json["nodeId"], "n1");
    assert_eq!(json["fromStatus"], "pending");
    assert_eq!(json["graphId"], "gph-x");
}
