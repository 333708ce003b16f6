//! The copper-sparrow flow execution engine.
//!
//! Flows are directed graphs of typed nodes that react to inbound chat
//! messages. The engine is a resumable interpreter: each inbound message (or
//! due timer) is one stateless invocation that loads the customer's
//! execution, walks the graph until a wait, an end, or a dead end, and
//! persists the new state through one conditional write.
//!
//! Layout, leaves first:
//!
//! - [`variables`], [`template`], [`condition`]: the variable environment
//!   and the pure evaluation helpers over it
//! - [`node`], [`edge`], [`graph`], [`definition`], [`trigger`]: the stored
//!   flow shape
//! - [`execution`], [`store`], [`memory`]: walk state and the collaborator
//!   contracts
//! - [`dispatch`], [`engine`]: node dispatch and the lifecycle orchestrator

pub mod condition;
pub mod definition;
pub mod dispatch;
pub mod edge;
pub mod engine;
pub mod error;
pub mod execution;
pub mod graph;
pub mod memory;
pub mod node;
pub mod store;
pub mod template;
pub mod trigger;
pub mod variables;

pub use definition::Flow;
pub use dispatch::{DispatchContext, DispatchOutcome, NodeDispatcher};
pub use edge::Edge;
pub use engine::{EngineConfig, EngineOutcome, FlowEngine};
pub use error::{EngineError, GraphError};
pub use execution::{Execution, ExecutionLogEntry, ExecutionStatus, WaitKind};
pub use graph::{FlowGraph, GraphDoc};
pub use node::{Node, NodeKind};
pub use store::{ChannelDirectory, ExecutionStore, FlowBundle, GraphStore, StoreError};
pub use template::interpolate;
pub use trigger::{TriggerRule, match_flow};
pub use variables::VariableEnvironment;
