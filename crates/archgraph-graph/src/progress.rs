use archgraph_core::{
    EdgeRepository, EdgeType, NodeRepository, NodeSummary, Result, VersionRepository,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Components not yet complete for a version whose dependencies all are:
/// the actionable frontier of work.
pub struct GetNextImplementable {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
    versions: Arc<dyn VersionRepository>,
}

impl GetNextImplementable {
    pub fn new(
        nodes: Arc<dyn NodeRepository>,
        edges: Arc<dyn EdgeRepository>,
        versions: Arc<dyn VersionRepository>,
    ) -> Self {
        Self {
            nodes,
            edges,
            versions,
        }
    }

    pub async fn execute(&self, version: &str) -> Result<Vec<NodeSummary>> {
        let nodes = self.nodes.find_all().await?;
        let dependencies = self.edges.find_by_type(EdgeType::DependsOn).await?;

        let progress: HashMap<String, u8> = self
            .versions
            .find_all()
            .await?
            .into_iter()
            .filter(|v| v.version == version)
            .map(|v| (v.node_id, v.progress))
            .collect();
        let progress_of = |id: &str| progress.get(id).copied().unwrap_or(0);

        let mut targets: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &dependencies {
            targets
                .entry(edge.source_id.as_str())
                .or_default()
                .push(edge.target_id.as_str());
        }

        let ready: Vec<NodeSummary> = nodes
            .iter()
            .filter(|n| !n.is_layer())
            .filter(|n| progress_of(n.id.as_str()) < 100)
            .filter(|n| {
                targets
                    .get(n.id.as_str())
                    .into_iter()
                    .flatten()
                    .all(|&target| progress_of(target) >= 100)
            })
            .map(|n| n.summary())
            .collect();

        debug!(version, ready = ready.len(), "Computed next implementable components");
        Ok(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{component, depends_on, fixture_with_versions, layer};
    use archgraph_core::Version;

    fn ids(nodes: &[NodeSummary]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn frontier_excludes_complete_and_blocked_nodes() {
        let repos = fixture_with_versions(
            vec![component("a"), component("b")],
            vec![depends_on("a", "b")],
            vec![
                Version::new("a", "mvp").with_progress(40),
                Version::new("b", "mvp").with_progress(100),
            ],
        );
        let next = GetNextImplementable::new(
            repos.nodes.clone(),
            repos.edges.clone(),
            repos.versions.clone(),
        )
        .execute("mvp")
        .await
        .unwrap();
        assert_eq!(ids(&next), vec!["a"]);
    }

    #[tokio::test]
    async fn incomplete_dependency_blocks_dependent() {
        let repos = fixture_with_versions(
            vec![layer("core"), component("a"), component("b"), component("c")],
            vec![depends_on("a", "b"), depends_on("c", "ghost")],
            vec![
                Version::new("b", "mvp").with_progress(99),
                Version::new("b", "v1").with_progress(100),
            ],
        );
        let use_case = GetNextImplementable::new(
            repos.nodes.clone(),
            repos.edges.clone(),
            repos.versions.clone(),
        );

        assert_eq!(ids(&use_case.execute("mvp").await.unwrap()), vec!["b"]);
        assert_eq!(ids(&use_case.execute("v1").await.unwrap()), vec!["a"]);
    }
}
