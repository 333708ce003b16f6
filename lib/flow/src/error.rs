//! Error types for the flow engine.

use copper_sparrow_core::FlowId;
use std::fmt;

use crate::store::StoreError;

/// Errors that abort a single engine invocation.
///
/// Per the containment policy, external-call failures (gateway sends, API
/// calls) are never surfaced here; they are recorded into the variable
/// environment and the walk continues. Only configuration problems and store
/// failures abort an invocation.
#[derive(Debug)]
pub enum EngineError {
    /// The flow's graph has no trigger node, so there is nowhere to start.
    MissingTrigger { flow_id: FlowId },
    /// No channel credentials are configured for the message's channel.
    UnknownChannel { channel: String },
    /// The dispatch loop exceeded the configured step ceiling.
    StepCeiling { limit: u32 },
    /// A collaborator store failed.
    Store(StoreError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTrigger { flow_id } => {
                write!(f, "flow {flow_id} has no trigger node")
            }
            Self::UnknownChannel { channel } => {
                write!(f, "no credentials configured for channel {channel}")
            }
            Self::StepCeiling { limit } => {
                write!(f, "dispatch loop exceeded the step ceiling of {limit}")
            }
            Self::Store(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Errors building a [`FlowGraph`](crate::graph::FlowGraph) from stored parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An edge references a node id that is not in the node set.
    UnknownNode { node_id: String },
    /// The graph has no trigger node, or more than one.
    TriggerCount { found: usize },
    /// A node's outgoing edges do not match the shape its kind admits.
    EdgeShape {
        node_id: String,
        expected: &'static str,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node_id } => {
                write!(f, "edge references unknown node {node_id}")
            }
            Self::TriggerCount { found } => {
                write!(f, "expected exactly one trigger node, found {found}")
            }
            Self::EdgeShape { node_id, expected } => {
                write!(f, "node {node_id} admits {expected}")
            }
        }
    }
}

impl std::error::Error for GraphError {}
