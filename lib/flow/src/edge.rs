//! Directed edges between flow nodes.

use serde::{Deserialize, Serialize};

/// A directed connection between two nodes in a flow graph.
///
/// `source_handle` selects among multiple outgoing edges of a branching node
/// (`"true"`/`"false"`, `"loop"`/`"complete"`, a random-choice value). Edges
/// without a handle are followed by non-branching results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Id of the node this edge leaves.
    pub source: String,
    /// Id of the node this edge enters.
    pub target: String,
    /// Branch label, if this edge belongs to a labeled branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

impl Edge {
    /// Creates an unlabeled edge.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
        }
    }

    /// Creates an edge labeled with a branch handle.
    #[must_use]
    pub fn with_handle(
        source: impl Into<String>,
        target: impl Into<String>,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: Some(handle.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_uses_camel_case_on_the_wire() {
        let edge = Edge::with_handle("a", "b", "true");
        let json = serde_json::to_value(&edge).expect("serialize");
        assert_eq!(json["sourceHandle"], "true");
    }

    #[test]
    fn missing_handle_deserializes_as_none() {
        let edge: Edge =
            serde_json::from_value(serde_json::json!({"source": "a", "target": "b"}))
                .expect("deserialize");
        assert!(edge.source_handle.is_none());
    }
}
