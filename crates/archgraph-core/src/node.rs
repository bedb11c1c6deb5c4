use crate::{NodeId, NodeSummary, NodeType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static KEBAB_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static kebab-case pattern"));

/// A vertex of the architecture graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub layer: Option<NodeId>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub current_version: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            layer: None,
            color: None,
            icon: None,
            description: None,
            tags: Vec::new(),
            sort_order: 0,
            current_version: None,
        }
    }

    pub fn with_layer(mut self, layer: impl Into<NodeId>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }

    pub fn is_layer(&self) -> bool {
        self.node_type == NodeType::Layer
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            node_type: self.node_type.to_string(),
        }
    }

    /// Node ids are lowercase kebab-case: `api-gateway`, `store-2`.
    pub fn is_valid_id(id: &str) -> bool {
        KEBAB_CASE.is_match(id)
    }
}
