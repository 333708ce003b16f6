//! The durable execution record and its append-only log.
//!
//! The execution record is the single carrier of continuation state between
//! engine invocations. Its `version` field is an optimistic lock: every
//! invocation loads a version, mutates in memory, and writes back exactly
//! once conditional on that version.

use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, CustomerId, ExecutionId, ExecutionLogId, FlowId};
use serde::{Deserialize, Serialize};

use crate::variables::VariableEnvironment;

/// Lifecycle state of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// An invocation is (or was) walking the graph.
    Running,
    /// Suspended until the next inbound message or a timer.
    Waiting,
    /// Terminal. Completed executions are never resumed.
    Completed,
}

/// What a waiting execution is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitKind {
    /// Any inbound message.
    #[default]
    Any,
    Text,
    Button,
    List,
    /// A scheduled timer; `resume_at` says when.
    Timer,
}

/// The resumable state of one customer's walk through one flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub flow_id: FlowId,
    pub customer_id: CustomerId,
    pub channel_id: ChannelId,
    /// The node the walk is positioned at. While waiting, this is the node
    /// that suspended; resume steps past it without re-dispatching.
    pub current_node_id: String,
    pub status: ExecutionStatus,
    /// Set while `status` is waiting.
    pub waiting_for: Option<WaitKind>,
    /// When a timer wait becomes due. Set only for [`WaitKind::Timer`].
    pub resume_at: Option<DateTime<Utc>>,
    /// The conversation's variable environment.
    pub variables: VariableEnvironment,
    /// Optimistic-lock version, incremented on every persisted write.
    pub version: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    /// Creates a fresh execution positioned at the flow's trigger node.
    #[must_use]
    pub fn start(
        flow_id: FlowId,
        customer_id: CustomerId,
        channel_id: ChannelId,
        trigger_node_id: impl Into<String>,
        variables: VariableEnvironment,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            flow_id,
            customer_id,
            channel_id,
            current_node_id: trigger_node_id.into(),
            status: ExecutionStatus::Running,
            waiting_for: None,
            resume_at: None,
            variables,
            version: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Returns true while the execution can still advance.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status != ExecutionStatus::Completed
    }

    /// Suspends at `node_id` until the given wait is satisfied.
    pub fn suspend(&mut self, node_id: &str, waiting_for: WaitKind, resume_at: Option<DateTime<Utc>>) {
        self.current_node_id = node_id.to_string();
        self.status = ExecutionStatus::Waiting;
        self.waiting_for = Some(waiting_for);
        self.resume_at = resume_at;
    }

    /// Marks the execution terminal at `node_id`.
    pub fn complete(&mut self, node_id: &str) {
        self.current_node_id = node_id.to_string();
        self.status = ExecutionStatus::Completed;
        self.waiting_for = None;
        self.resume_at = None;
        self.completed_at = Some(Utc::now());
    }
}

/// One append-only observability record per dispatched node.
///
/// Never read back by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: ExecutionLogId,
    pub execution_id: ExecutionId,
    pub node_id: String,
    /// Wire name of the node kind (`sendText`, `condition`, ...).
    pub node_kind: String,
    /// Outcome summary for operators.
    pub result: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    /// Builds a log entry recorded now.
    #[must_use]
    pub fn new(
        execution_id: ExecutionId,
        node_id: impl Into<String>,
        node_kind: impl Into<String>,
        result: serde_json::Value,
    ) -> Self {
        Self {
            id: ExecutionLogId::new(),
            execution_id,
            node_id: node_id.into(),
            node_kind: node_kind.into(),
            result,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution() -> Execution {
        Execution::start(
            FlowId::new(),
            CustomerId::new(),
            ChannelId::new(),
            "start",
            VariableEnvironment::new(),
        )
    }

    #[test]
    fn fresh_execution_is_open_at_version_zero() {
        let exec = execution();
        assert!(exec.is_open());
        assert_eq!(exec.version, 0);
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert_eq!(exec.current_node_id, "start");
    }

    #[test]
    fn suspend_records_wait_state() {
        let mut exec = execution();
        exec.suspend("ask", WaitKind::Text, None);
        assert!(exec.is_open());
        assert_eq!(exec.status, ExecutionStatus::Waiting);
        assert_eq!(exec.waiting_for, Some(WaitKind::Text));
        assert_eq!(exec.current_node_id, "ask");
    }

    #[test]
    fn complete_clears_wait_state() {
        let mut exec = execution();
        exec.suspend("pause", WaitKind::Timer, Some(Utc::now()));
        exec.complete("done");
        assert!(!exec.is_open());
        assert!(exec.waiting_for.is_none());
        assert!(exec.resume_at.is_none());
        assert!(exec.completed_at.is_some());
    }
}
