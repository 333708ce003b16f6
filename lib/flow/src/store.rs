//! Collaborator contracts the engine drives.
//!
//! The engine owns no storage of its own; it reads flows through a
//! [`GraphStore`], persists walk state through an [`ExecutionStore`], and
//! resolves channel credentials through a [`ChannelDirectory`]. The server
//! binary wires PostgreSQL-backed implementations; tests and embedders use
//! the in-memory ones in [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, CustomerId, ExecutionId, FlowId};
use copper_sparrow_messaging::ChannelCredentials;
use std::fmt;

use crate::definition::Flow;
use crate::execution::{Execution, ExecutionLogEntry};
use crate::graph::FlowGraph;

/// Errors from the graph and execution stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested record does not exist.
    NotFound { what: &'static str, id: String },
    /// A conditional execution write lost the race: the stored version no
    /// longer matches the one the invocation loaded.
    VersionConflict { execution_id: ExecutionId },
    /// The backend failed.
    Backend { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { what, id } => write!(f, "{what} {id} not found"),
            Self::VersionConflict { execution_id } => {
                write!(f, "execution {execution_id} was advanced by another invocation")
            }
            Self::Backend { message } => write!(f, "store backend failure: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A flow definition together with its graph.
#[derive(Debug, Clone)]
pub struct FlowBundle {
    pub flow: Flow,
    pub graph: FlowGraph,
}

/// Read-only access to flow definitions and graphs.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Loads one flow and its graph.
    async fn load_flow(&self, flow_id: FlowId) -> Result<FlowBundle, StoreError>;

    /// Active, published flows for a channel, ordered by priority descending.
    async fn find_candidate_flows(&self, channel_id: ChannelId) -> Result<Vec<Flow>, StoreError>;
}

/// Durable storage for executions and their log.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// The open (running or waiting) execution for a customer on a channel,
    /// if one exists. At most one ever does.
    async fn find_open(
        &self,
        customer_id: CustomerId,
        channel_id: ChannelId,
    ) -> Result<Option<Execution>, StoreError>;

    /// Executions waiting on a timer whose `resume_at` has passed.
    async fn find_due_timers(&self, now: DateTime<Utc>) -> Result<Vec<Execution>, StoreError>;

    /// Persists a fresh execution.
    async fn create(&self, execution: &Execution) -> Result<(), StoreError>;

    /// Conditionally persists an updated execution: the write succeeds only
    /// while the stored version equals `expected_version`. The caller sets
    /// `execution.version` to the successor version before calling.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] when another invocation got there
    /// first.
    async fn update(&self, execution: &Execution, expected_version: i64)
        -> Result<(), StoreError>;

    /// Appends one observability record. Best effort; the engine logs and
    /// continues when this fails.
    async fn append_log(&self, entry: ExecutionLogEntry) -> Result<(), StoreError>;
}

/// Resolves channel credentials for outbound sends.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Credentials for a channel, or `None` when it is not configured.
    async fn credentials(&self, channel_id: ChannelId) -> Option<ChannelCredentials>;
}
