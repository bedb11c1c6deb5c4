//! Enriched export of the whole architecture: layers with their children,
//! every component annotated with version progress and feature summaries,
//! relationship edges and collection totals.

use archgraph_core::{
    Edge, EdgeRepository, Feature, FeatureRepository, Node, NodeRepository, Result, Version,
    VersionRepository, VersionStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub content: Option<String>,
    pub progress: u8,
    pub status: VersionStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<&Version> for VersionSummary {
    fn from(version: &Version) -> Self {
        Self {
            content: version.content.clone(),
            progress: version.progress,
            status: version.status,
            updated_at: version.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub filename: String,
    pub title: String,
    pub step_count: u32,
}

impl From<&Feature> for FeatureSummary {
    fn from(feature: &Feature) -> Self {
        Self {
            filename: feature.filename.clone(),
            title: feature.title.clone(),
            step_count: feature.step_count,
        }
    }
}

/// A node with its versions keyed by tag and its features grouped by tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    #[serde(flatten)]
    pub node: Node,
    pub versions: BTreeMap<String, VersionSummary>,
    pub features: BTreeMap<String, Vec<FeatureSummary>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerView {
    #[serde(flatten)]
    pub view: NodeView,
    pub children: Vec<NodeView>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_versions: usize,
    pub total_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub generated_at: DateTime<Utc>,
    pub layers: Vec<LayerView>,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<Edge>,
    pub stats: ArchitectureStats,
}

impl Architecture {
    pub fn find_node(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.node.id == id)
    }

    pub fn find_layer(&self, id: &str) -> Option<&LayerView> {
        self.layers.iter().find(|l| l.view.node.id == id)
    }
}

pub struct GetArchitecture {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
    versions: Arc<dyn VersionRepository>,
    features: Arc<dyn FeatureRepository>,
}

impl GetArchitecture {
    pub fn new(
        nodes: Arc<dyn NodeRepository>,
        edges: Arc<dyn EdgeRepository>,
        versions: Arc<dyn VersionRepository>,
        features: Arc<dyn FeatureRepository>,
    ) -> Self {
        Self {
            nodes,
            edges,
            versions,
            features,
        }
    }

    pub async fn execute(&self) -> Result<Architecture> {
        let nodes = self.nodes.find_all().await?;
        let edges = self.edges.find_all().await?;
        let versions = self.versions.find_all().await?;
        let features = self.features.find_all().await?;

        let stats = ArchitectureStats {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            total_versions: versions.len(),
            total_features: features.len(),
        };

        let mut versions_by_node: HashMap<&str, BTreeMap<String, VersionSummary>> = HashMap::new();
        for version in &versions {
            versions_by_node
                .entry(version.node_id.as_str())
                .or_default()
                .insert(version.version.clone(), version.into());
        }

        let mut features_by_node: HashMap<&str, BTreeMap<String, Vec<FeatureSummary>>> =
            HashMap::new();
        for feature in &features {
            features_by_node
                .entry(feature.node_id.as_str())
                .or_default()
                .entry(feature.version.clone())
                .or_default()
                .push(feature.into());
        }

        let view = |node: &Node| NodeView {
            node: node.clone(),
            versions: versions_by_node
                .get(node.id.as_str())
                .cloned()
                .unwrap_or_default(),
            features: features_by_node
                .get(node.id.as_str())
                .cloned()
                .unwrap_or_default(),
        };

        let mut layer_nodes: Vec<&Node> = nodes.iter().filter(|n| n.is_layer()).collect();
        layer_nodes.sort_by(|a, b| (a.sort_order, &a.id).cmp(&(b.sort_order, &b.id)));

        let layers = layer_nodes
            .into_iter()
            .map(|layer| {
                let mut children: Vec<&Node> = nodes
                    .iter()
                    .filter(|n| !n.is_layer() && n.layer.as_deref() == Some(layer.id.as_str()))
                    .collect();
                children.sort_by(|a, b| (a.sort_order, &a.id).cmp(&(b.sort_order, &b.id)));
                LayerView {
                    view: view(layer),
                    children: children.into_iter().map(&view).collect(),
                }
            })
            .collect();

        let component_views = nodes.iter().filter(|n| !n.is_layer()).map(&view).collect();
        let relationships = edges
            .into_iter()
            .filter(|e| e.edge_type.is_relationship())
            .collect();

        debug!(
            nodes = stats.total_nodes,
            edges = stats.total_edges,
            "Assembled architecture export"
        );

        Ok(Architecture {
            generated_at: Utc::now(),
            layers,
            nodes: component_views,
            edges: relationships,
            stats,
        })
    }
}
