use crate::{
    ApiKey, Edge, EdgeId, EdgeType, Feature, Node, NodeType, Result, StepCountSummary, Version,
};
use async_trait::async_trait;

/// `find_all` implementations return records in insertion order; graph
/// queries break ties by that order.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Node>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Node>>;
    async fn find_by_type(&self, node_type: NodeType) -> Result<Vec<Node>>;
    async fn find_by_layer(&self, layer_id: &str) -> Result<Vec<Node>>;
    async fn exists(&self, id: &str) -> Result<bool>;
    /// Inserts or replaces the node with the same id.
    async fn save(&self, node: Node) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait EdgeRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Edge>>;
    async fn find_by_source(&self, source_id: &str) -> Result<Vec<Edge>>;
    async fn find_by_target(&self, target_id: &str) -> Result<Vec<Edge>>;
    async fn find_by_type(&self, edge_type: EdgeType) -> Result<Vec<Edge>>;
    /// Every edge except `CONTAINS`.
    async fn find_relationships(&self) -> Result<Vec<Edge>>;
    /// Upserts on `(source_id, target_id, type)` and returns the stored edge with its id.
    async fn save(&self, edge: Edge) -> Result<Edge>;
    async fn delete(&self, id: EdgeId) -> Result<bool>;
}

#[async_trait]
pub trait VersionRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Version>>;
    async fn find_by_node(&self, node_id: &str) -> Result<Vec<Version>>;
    async fn find_by_node_and_version(
        &self,
        node_id: &str,
        version: &str,
    ) -> Result<Option<Version>>;
    /// Upserts on `(node_id, version)`.
    async fn save(&self, version: Version) -> Result<()>;
    async fn delete_by_node(&self, node_id: &str) -> Result<usize>;
}

#[async_trait]
pub trait FeatureRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Feature>>;
    async fn find_by_node(&self, node_id: &str) -> Result<Vec<Feature>>;
    async fn find_by_node_and_version(&self, node_id: &str, version: &str)
        -> Result<Vec<Feature>>;
    async fn get_step_count_summary(&self) -> Result<Vec<StepCountSummary>>;
    /// Upserts on `(node_id, version, filename)`.
    async fn save(&self, feature: Feature) -> Result<()>;
    async fn delete_all(&self) -> Result<usize>;
    async fn delete_by_node(&self, node_id: &str) -> Result<usize>;
    async fn delete_by_node_and_filename(&self, node_id: &str, filename: &str) -> Result<usize>;
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<ApiKey>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<ApiKey>>;
    /// Upserts on `name`.
    async fn save(&self, key: ApiKey) -> Result<()>;
    /// Records a successful authentication.
    async fn touch(&self, name: &str) -> Result<()>;
    async fn revoke(&self, name: &str) -> Result<bool>;
}
