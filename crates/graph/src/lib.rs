// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agx-graph: Optimistically-versioned execution graphs and the durable
//! tick driver that advances them.

mod driver;
mod error;
mod event;
mod model;
mod queue;
mod scheduler;
mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use driver::{GraphRuntime, TickDriverConfig};
pub use error::GraphError;
pub use event::{derive_events, BudgetType, GraphEvent, GraphEventRecord, PendingEvent};
pub use model::{
    DoneCriteria, Edge, EdgeCondition, EdgeType, ExecutionBudget, ExecutionPolicy, Graph,
    GraphId, GraphMode, Node, NodeStatus, NodeType, PriorityMode, RetryPolicy,
};
pub use queue::{MemoryTickQueue, NdjsonTickQueue, TickJob, TickQueue};
pub use scheduler::{Scheduler, SchedulerTick};
pub use store::{FsGraphStore, GraphStore, MemoryGraphStore};
