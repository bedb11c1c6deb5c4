//! In-memory repositories backing the CLI, the API server and the tests.
//!
//! Each store keeps records in a `Vec` so `find_all` preserves insertion
//! order. Locks are never held across an await point.

use crate::{
    ApiKey, ApiKeyRepository, Edge, EdgeId, EdgeRepository, EdgeType, Feature,
    FeatureRepository, Node, NodeRepository, NodeType, Result, StepCountSummary, Version,
    VersionRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct InMemoryNodeRepository {
    nodes: RwLock<Vec<Node>>,
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self {
            nodes: RwLock::new(nodes),
        }
    }
}

#[async_trait]
impl NodeRepository for InMemoryNodeRepository {
    async fn find_all(&self) -> Result<Vec<Node>> {
        Ok(self.nodes.read().clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.nodes.read().iter().find(|n| n.id == id).cloned())
    }

    async fn find_by_type(&self, node_type: NodeType) -> Result<Vec<Node>> {
        Ok(self
            .nodes
            .read()
            .iter()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect())
    }

    async fn find_by_layer(&self, layer_id: &str) -> Result<Vec<Node>> {
        Ok(self
            .nodes
            .read()
            .iter()
            .filter(|n| n.layer.as_deref() == Some(layer_id))
            .cloned()
            .collect())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.nodes.read().iter().any(|n| n.id == id))
    }

    async fn save(&self, node: Node) -> Result<()> {
        let mut nodes = self.nodes.write();
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|n| n.id != id);
        Ok(nodes.len() != before)
    }
}

#[derive(Debug)]
pub struct InMemoryEdgeRepository {
    edges: RwLock<Vec<Edge>>,
    next_id: AtomicI64,
}

impl Default for InMemoryEdgeRepository {
    fn default() -> Self {
        Self {
            edges: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryEdgeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, assigning ids to edges that have none. An id seen
    /// earlier in the list is replaced with a fresh one.
    pub fn with_edges(edges: Vec<Edge>) -> Self {
        let max_id = edges.iter().filter_map(|e| e.id).max().unwrap_or(0);
        let next_id = AtomicI64::new(max_id + 1);
        let mut seen = HashSet::new();
        let edges = edges
            .into_iter()
            .map(|mut e| {
                if !e.id.is_some_and(|id| seen.insert(id)) {
                    let id = next_id.fetch_add(1, Ordering::SeqCst);
                    seen.insert(id);
                    e.id = Some(id);
                }
                e
            })
            .collect();
        Self {
            edges: RwLock::new(edges),
            next_id,
        }
    }

    fn filtered(&self, keep: impl Fn(&Edge) -> bool) -> Vec<Edge> {
        self.edges.read().iter().filter(|&e| keep(e)).cloned().collect()
    }
}

#[async_trait]
impl EdgeRepository for InMemoryEdgeRepository {
    async fn find_all(&self) -> Result<Vec<Edge>> {
        Ok(self.edges.read().clone())
    }

    async fn find_by_source(&self, source_id: &str) -> Result<Vec<Edge>> {
        Ok(self.filtered(|e| e.source_id == source_id))
    }

    async fn find_by_target(&self, target_id: &str) -> Result<Vec<Edge>> {
        Ok(self.filtered(|e| e.target_id == target_id))
    }

    async fn find_by_type(&self, edge_type: EdgeType) -> Result<Vec<Edge>> {
        Ok(self.filtered(|e| e.edge_type == edge_type))
    }

    async fn find_relationships(&self) -> Result<Vec<Edge>> {
        Ok(self.filtered(|e| e.edge_type.is_relationship()))
    }

    async fn save(&self, mut edge: Edge) -> Result<Edge> {
        let mut edges = self.edges.write();
        if let Some(existing) = edges.iter_mut().find(|e| e.same_relation(&edge)) {
            existing.label = edge.label;
            existing.metadata = edge.metadata;
            return Ok(existing.clone());
        }
        match edge.id {
            Some(id) if !edges.iter().any(|e| e.id == Some(id)) => {
                self.next_id.fetch_max(id + 1, Ordering::SeqCst);
            }
            _ => edge.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst)),
        }
        edges.push(edge.clone());
        Ok(edge)
    }

    async fn delete(&self, id: EdgeId) -> Result<bool> {
        let mut edges = self.edges.write();
        let before = edges.len();
        edges.retain(|e| e.id != Some(id));
        Ok(edges.len() != before)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryVersionRepository {
    versions: RwLock<Vec<Version>>,
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(versions: Vec<Version>) -> Self {
        Self {
            versions: RwLock::new(versions),
        }
    }
}

#[async_trait]
impl VersionRepository for InMemoryVersionRepository {
    async fn find_all(&self) -> Result<Vec<Version>> {
        Ok(self.versions.read().clone())
    }

    async fn find_by_node(&self, node_id: &str) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .read()
            .iter()
            .filter(|v| v.node_id == node_id)
            .cloned()
            .collect())
    }

    async fn find_by_node_and_version(
        &self,
        node_id: &str,
        version: &str,
    ) -> Result<Option<Version>> {
        Ok(self
            .versions
            .read()
            .iter()
            .find(|v| v.node_id == node_id && v.version == version)
            .cloned())
    }

    async fn save(&self, version: Version) -> Result<()> {
        let mut versions = self.versions.write();
        match versions
            .iter_mut()
            .find(|v| v.node_id == version.node_id && v.version == version.version)
        {
            Some(existing) => *existing = version,
            None => versions.push(version),
        }
        Ok(())
    }

    async fn delete_by_node(&self, node_id: &str) -> Result<usize> {
        let mut versions = self.versions.write();
        let before = versions.len();
        versions.retain(|v| v.node_id != node_id);
        Ok(before - versions.len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFeatureRepository {
    features: RwLock<Vec<Feature>>,
}

impl InMemoryFeatureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(features: Vec<Feature>) -> Self {
        Self {
            features: RwLock::new(features),
        }
    }

    fn remove_where(&self, doomed: impl Fn(&Feature) -> bool) -> usize {
        let mut features = self.features.write();
        let before = features.len();
        features.retain(|f| !doomed(f));
        before - features.len()
    }
}

#[async_trait]
impl FeatureRepository for InMemoryFeatureRepository {
    async fn find_all(&self) -> Result<Vec<Feature>> {
        Ok(self.features.read().clone())
    }

    async fn find_by_node(&self, node_id: &str) -> Result<Vec<Feature>> {
        Ok(self
            .features
            .read()
            .iter()
            .filter(|f| f.node_id == node_id)
            .cloned()
            .collect())
    }

    async fn find_by_node_and_version(
        &self,
        node_id: &str,
        version: &str,
    ) -> Result<Vec<Feature>> {
        Ok(self
            .features
            .read()
            .iter()
            .filter(|f| f.node_id == node_id && f.version == version)
            .cloned()
            .collect())
    }

    async fn get_step_count_summary(&self) -> Result<Vec<StepCountSummary>> {
        let mut totals: BTreeMap<(String, String), (u32, u32)> = BTreeMap::new();
        for feature in self.features.read().iter() {
            let entry = totals
                .entry((feature.node_id.clone(), feature.version.clone()))
                .or_default();
            entry.0 += 1;
            entry.1 += feature.step_count;
        }
        Ok(totals
            .into_iter()
            .map(|((node_id, version), (feature_count, step_count))| StepCountSummary {
                node_id,
                version,
                feature_count,
                step_count,
            })
            .collect())
    }

    async fn save(&self, feature: Feature) -> Result<()> {
        let mut features = self.features.write();
        match features.iter_mut().find(|f| {
            f.node_id == feature.node_id
                && f.version == feature.version
                && f.filename == feature.filename
        }) {
            Some(existing) => *existing = feature,
            None => features.push(feature),
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize> {
        Ok(self.remove_where(|_| true))
    }

    async fn delete_by_node(&self, node_id: &str) -> Result<usize> {
        Ok(self.remove_where(|f| f.node_id == node_id))
    }

    async fn delete_by_node_and_filename(&self, node_id: &str, filename: &str) -> Result<usize> {
        Ok(self.remove_where(|f| f.node_id == node_id && f.filename == filename))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: RwLock<Vec<ApiKey>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: Vec<ApiKey>) -> Self {
        Self {
            keys: RwLock::new(keys),
        }
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn find_all(&self) -> Result<Vec<ApiKey>> {
        Ok(self.keys.read().clone())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ApiKey>> {
        Ok(self.keys.read().iter().find(|k| k.name == name).cloned())
    }

    async fn save(&self, key: ApiKey) -> Result<()> {
        let mut keys = self.keys.write();
        match keys.iter_mut().find(|k| k.name == key.name) {
            Some(existing) => *existing = key,
            None => keys.push(key),
        }
        Ok(())
    }

    async fn touch(&self, name: &str) -> Result<()> {
        if let Some(key) = self.keys.write().iter_mut().find(|k| k.name == name) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn revoke(&self, name: &str) -> Result<bool> {
        match self.keys.write().iter_mut().find(|k| k.name == name) {
            Some(key) if key.is_active => {
                key.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn node_save_replaces_in_place() {
        let repo = InMemoryNodeRepository::new();
        repo.save(Node::new("a", "A", NodeType::Component)).await.unwrap();
        repo.save(Node::new("b", "B", NodeType::Component)).await.unwrap();
        repo.save(Node::new("a", "Renamed", NodeType::Component))
            .await
            .unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Renamed");
        assert!(repo.delete("a").await.unwrap());
        assert!(!repo.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn edge_save_upserts_on_triple() {
        let repo = InMemoryEdgeRepository::new();
        let first = repo
            .save(Edge::new("a", "b", EdgeType::DependsOn))
            .await
            .unwrap();
        let again = repo
            .save(Edge::new("a", "b", EdgeType::DependsOn).with_label("needs"))
            .await
            .unwrap();
        let other = repo
            .save(Edge::new("a", "b", EdgeType::ReadsFrom))
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.label.as_deref(), Some("needs"));
        assert_ne!(first.id, other.id);
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn seeded_edges_keep_ids_and_continue_numbering() {
        let mut seeded = Edge::new("a", "b", EdgeType::DependsOn);
        seeded.id = Some(7);
        let repo = InMemoryEdgeRepository::with_edges(vec![
            seeded,
            Edge::new("layer", "a", EdgeType::Contains),
        ]);
        let all = repo.find_all().await.unwrap();
        assert_eq!(all[0].id, Some(7));
        assert_eq!(all[1].id, Some(8));

        let saved = repo
            .save(Edge::new("b", "c", EdgeType::DependsOn))
            .await
            .unwrap();
        assert_eq!(saved.id, Some(9));
        assert_eq!(repo.find_relationships().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn seeded_duplicate_ids_are_renumbered() {
        let mut first = Edge::new("a", "b", EdgeType::DependsOn);
        first.id = Some(3);
        let mut second = Edge::new("b", "c", EdgeType::DependsOn);
        second.id = Some(3);
        let repo = InMemoryEdgeRepository::with_edges(vec![first, second]);

        let ids: Vec<_> = repo.find_all().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Some(3), Some(4)]);

        assert!(repo.delete(3).await.unwrap());
        let left = repo.find_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].source_id, "b");
    }

    #[tokio::test]
    async fn step_count_summary_groups_by_node_and_version() {
        let repo = InMemoryFeatureRepository::new();
        repo.save(Feature::parse("a", "mvp", "one.feature", "Given x\nThen y"))
            .await
            .unwrap();
        repo.save(Feature::parse("a", "mvp", "two.feature", "Given z"))
            .await
            .unwrap();
        repo.save(Feature::parse("a", "v1", "one.feature", "Given x"))
            .await
            .unwrap();

        let summary = repo.get_step_count_summary().await.unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].version, "mvp");
        assert_eq!(summary[0].feature_count, 2);
        assert_eq!(summary[0].step_count, 3);

        assert_eq!(repo.delete_by_node_and_filename("a", "one.feature").await.unwrap(), 2);
        assert_eq!(repo.delete_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn revoke_deactivates_once() {
        let (key, _) = ApiKey::generate("ci", vec![], None);
        let repo = InMemoryApiKeyRepository::with_keys(vec![key]);
        assert!(repo.revoke("ci").await.unwrap());
        assert!(!repo.revoke("ci").await.unwrap());
        assert!(!repo.revoke("missing").await.unwrap());
    }
}
