use crate::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: Option<EdgeId>,
    pub source_id: NodeId,
    pub target_id: NodeId,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

/// Reduced edge shape used in neighbourhood results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    pub source_id: NodeId,
    pub target_id: NodeId,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, edge_type: EdgeType) -> Self {
        Self {
            id: None,
            source_id: source.into(),
            target_id: target.into(),
            edge_type,
            label: None,
            metadata: None,
        }
    }

    pub fn contains(layer: impl Into<NodeId>, child: impl Into<NodeId>) -> Self {
        Self::new(layer, child, EdgeType::Contains)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// True when both edges describe the same `(source, target, type)` triple.
    pub fn same_relation(&self, other: &Edge) -> bool {
        self.source_id == other.source_id
            && self.target_id == other.target_id
            && self.edge_type == other.edge_type
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }

    pub fn to_ref(&self) -> EdgeRef {
        EdgeRef {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            edge_type: self.edge_type,
        }
    }
}
