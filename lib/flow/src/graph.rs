//! The flow graph the engine walks.
//!
//! Backed by a petgraph directed graph with a node-id index for O(1) lookup.
//! Cycles are legal (loop nodes bound them); the walk never requires a valid
//! graph, it just dead-ends. The whole graph is stored as one JSONB document
//! of `{nodes, edges}`.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::edge::Edge;
use crate::error::GraphError;
use crate::node::{Node, NodeKind};

/// The stored wire form of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDoc {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// A flow's node graph, indexed for the walk.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    graph: DiGraph<Node, Edge>,
    node_index_map: HashMap<String, NodeIndex>,
}

impl FlowGraph {
    /// Builds a graph from stored nodes and edges.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge references a node id that is not in the
    /// node set.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();
        for node in nodes {
            let id = node.id.clone();
            let index = graph.add_node(node);
            node_index_map.insert(id, index);
        }
        for edge in edges {
            let source = *node_index_map.get(&edge.source).ok_or_else(|| {
                GraphError::UnknownNode {
                    node_id: edge.source.clone(),
                }
            })?;
            let target = *node_index_map.get(&edge.target).ok_or_else(|| {
                GraphError::UnknownNode {
                    node_id: edge.target.clone(),
                }
            })?;
            graph.add_edge(source, target, edge);
        }
        Ok(Self {
            graph,
            node_index_map,
        })
    }

    /// Returns a node by its id.
    #[must_use]
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        let index = self.node_index_map.get(node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns the flow's trigger node, if the graph has exactly one.
    #[must_use]
    pub fn trigger(&self) -> Option<&Node> {
        let mut triggers = self.graph.node_weights().filter(|node| node.kind.is_trigger());
        let first = triggers.next()?;
        if triggers.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Outgoing edges of a node, in declaration order.
    #[must_use]
    pub fn outgoing(&self, node_id: &str) -> Vec<&Edge> {
        let Some(&index) = self.node_index_map.get(node_id) else {
            return Vec::new();
        };
        // petgraph iterates outgoing edges newest-first; reverse to recover
        // the stored order.
        let mut edges: Vec<&Edge> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| edge.weight())
            .collect();
        edges.reverse();
        edges
    }

    /// The first outgoing edge regardless of handle. Used to step past the
    /// trigger node and past a node that just resumed from a wait.
    #[must_use]
    pub fn any_edge_from(&self, node_id: &str) -> Option<&Edge> {
        self.outgoing(node_id).into_iter().next()
    }

    /// The outgoing edge labeled with `handle`.
    #[must_use]
    pub fn edge_for_handle(&self, node_id: &str, handle: &str) -> Option<&Edge> {
        self.outgoing(node_id)
            .into_iter()
            .find(|edge| edge.source_handle.as_deref() == Some(handle))
    }

    /// The first unlabeled outgoing edge. Non-branching results follow this.
    #[must_use]
    pub fn unlabeled_edge_from(&self, node_id: &str) -> Option<&Edge> {
        self.outgoing(node_id)
            .into_iter()
            .find(|edge| edge.source_handle.is_none())
    }

    /// Structural validation for authoring tools: exactly one trigger node,
    /// and each node's outgoing edges shaped the way its kind admits
    /// (branching kinds take labeled edges, terminal kinds take none, the
    /// rest take at most one unlabeled edge). Edge endpoints are already
    /// checked when the graph is built. The walk itself never calls this.
    pub fn validate(&self) -> Result<(), GraphError> {
        let found = self
            .graph
            .node_weights()
            .filter(|node| node.kind.is_trigger())
            .count();
        if found != 1 {
            return Err(GraphError::TriggerCount { found });
        }

        for node in self.graph.node_weights() {
            let edges = self.outgoing(&node.id);
            match &node.kind {
                NodeKind::End(_) => {
                    if !edges.is_empty() {
                        return Err(GraphError::EdgeShape {
                            node_id: node.id.clone(),
                            expected: "no outgoing edges",
                        });
                    }
                }
                NodeKind::Condition(_) | NodeKind::Loop(_) | NodeKind::RandomChoice(_) => {
                    if edges.iter().any(|edge| edge.source_handle.is_none()) {
                        return Err(GraphError::EdgeShape {
                            node_id: node.id.clone(),
                            expected: "only labeled outgoing edges",
                        });
                    }
                }
                _ => {
                    let unlabeled = edges
                        .iter()
                        .filter(|edge| edge.source_handle.is_none())
                        .count();
                    if unlabeled > 1 {
                        return Err(GraphError::EdgeShape {
                            node_id: node.id.clone(),
                            expected: "at most one unlabeled outgoing edge",
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The stored wire form.
    #[must_use]
    pub fn to_doc(&self) -> GraphDoc {
        GraphDoc {
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self
                .graph
                .edge_references()
                .map(|edge| edge.weight().clone())
                .collect(),
        }
    }
}

impl TryFrom<GraphDoc> for FlowGraph {
    type Error = GraphError;

    fn try_from(doc: GraphDoc) -> Result<Self, Self::Error> {
        Self::from_parts(doc.nodes, doc.edges)
    }
}

impl Serialize for FlowGraph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_doc().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FlowGraph {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = GraphDoc::deserialize(deserializer)?;
        Self::try_from(doc).map_err(serde::de::Error::custom)
    }
}
