use crate::ArchGraphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type NodeId = String;
pub type EdgeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Layer,
    Component,
    Store,
    External,
    Phase,
    App,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Layer => "layer",
            NodeType::Component => "component",
            NodeType::Store => "store",
            NodeType::External => "external",
            NodeType::Phase => "phase",
            NodeType::App => "app",
        }
    }
}

impl Default for NodeType {
    fn default() -> Self {
        NodeType::Component
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ArchGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "layer" => Ok(NodeType::Layer),
            "component" => Ok(NodeType::Component),
            "store" => Ok(NodeType::Store),
            "external" => Ok(NodeType::External),
            "phase" => Ok(NodeType::Phase),
            "app" => Ok(NodeType::App),
            other => Err(ArchGraphError::Validation(format!(
                "Invalid node type: {}. Must be one of: layer, component, store, external, phase, app",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Contains,
    Controls,
    DependsOn,
    ReadsFrom,
    WritesTo,
    DispatchesTo,
    EscalatesTo,
    Proxies,
    Sanitises,
    Gates,
    Sequence,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Contains => "CONTAINS",
            EdgeType::Controls => "CONTROLS",
            EdgeType::DependsOn => "DEPENDS_ON",
            EdgeType::ReadsFrom => "READS_FROM",
            EdgeType::WritesTo => "WRITES_TO",
            EdgeType::DispatchesTo => "DISPATCHES_TO",
            EdgeType::EscalatesTo => "ESCALATES_TO",
            EdgeType::Proxies => "PROXIES",
            EdgeType::Sanitises => "SANITISES",
            EdgeType::Gates => "GATES",
            EdgeType::Sequence => "SEQUENCE",
        }
    }

    /// Containment edges are implied by the layer nesting and left out of relationship views.
    pub fn is_relationship(&self) -> bool {
        !matches!(self, EdgeType::Contains)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = ArchGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CONTAINS" => Ok(EdgeType::Contains),
            "CONTROLS" => Ok(EdgeType::Controls),
            "DEPENDS_ON" => Ok(EdgeType::DependsOn),
            "READS_FROM" => Ok(EdgeType::ReadsFrom),
            "WRITES_TO" => Ok(EdgeType::WritesTo),
            "DISPATCHES_TO" => Ok(EdgeType::DispatchesTo),
            "ESCALATES_TO" => Ok(EdgeType::EscalatesTo),
            "PROXIES" => Ok(EdgeType::Proxies),
            "SANITISES" => Ok(EdgeType::Sanitises),
            "GATES" => Ok(EdgeType::Gates),
            "SEQUENCE" => Ok(EdgeType::Sequence),
            other => Err(ArchGraphError::Validation(format!(
                "Invalid edge type: {}",
                other
            ))),
        }
    }
}

/// The `{id, name, type}` projection every graph query returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

impl NodeSummary {
    /// Stand-in for an id that an edge references but the node store does not know.
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            node_type: "unknown".to_string(),
        }
    }
}
