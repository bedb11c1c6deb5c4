use crate::traversal::index_nodes;
use archgraph_core::{
    ArchGraphError, Edge, EdgeRepository, EdgeType, Node, NodeRepository, NodeSummary, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// `source -> [target...]` over `DEPENDS_ON` edges, in edge order.
pub(crate) fn dependency_adjacency(edges: &[Edge]) -> HashMap<&str, Vec<&str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges.iter().filter(|e| e.edge_type == EdgeType::DependsOn) {
        adjacency
            .entry(edge.source_id.as_str())
            .or_default()
            .push(edge.target_id.as_str());
    }
    adjacency
}

/// Surfaces `NodeNotFound` for callers that must reject unknown ids before
/// running a query that would otherwise return an empty result.
pub async fn ensure_node_exists(nodes: &dyn NodeRepository, id: &str) -> Result<()> {
    if nodes.exists(id).await? {
        Ok(())
    } else {
        Err(ArchGraphError::NodeNotFound(id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyTreeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyTreeNode>>,
}

impl DependencyTreeNode {
    /// Every id in this subtree, depth first.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = vec![self.id.as_str()];
        for child in self.dependencies.iter().flatten() {
            ids.extend(child.ids());
        }
        ids
    }
}

/// `DEPENDS_ON` targets of a node, expanded up to a depth.
///
/// One visited set spans the whole traversal, so a dependency reachable along
/// several paths is listed once, under the first parent that reaches it.
pub struct GetDependencyTree {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
}

impl GetDependencyTree {
    pub fn new(nodes: Arc<dyn NodeRepository>, edges: Arc<dyn EdgeRepository>) -> Self {
        Self { nodes, edges }
    }

    pub async fn execute(
        &self,
        node_id: &str,
        max_depth: usize,
    ) -> Result<Vec<DependencyTreeNode>> {
        debug!(node = node_id, max_depth, "Building dependency tree");

        let nodes = index_nodes(self.nodes.find_all().await?);
        let edges = self.edges.find_all().await?;
        let adjacency = dependency_adjacency(&edges);

        let mut visited = HashSet::from([node_id.to_string()]);
        Ok(expand(node_id, 1, max_depth, &adjacency, &nodes, &mut visited))
    }
}

fn expand(
    current: &str,
    depth: usize,
    max_depth: usize,
    adjacency: &HashMap<&str, Vec<&str>>,
    nodes: &HashMap<String, Node>,
    visited: &mut HashSet<String>,
) -> Vec<DependencyTreeNode> {
    if depth > max_depth {
        return Vec::new();
    }

    let mut children = Vec::new();
    for &target in adjacency.get(current).into_iter().flatten() {
        if !visited.insert(target.to_string()) {
            continue;
        }
        let Some(node) = nodes.get(target) else {
            continue;
        };
        let dependencies = if depth < max_depth {
            Some(expand(target, depth + 1, max_depth, adjacency, nodes, visited))
        } else {
            None
        };
        children.push(DependencyTreeNode {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type.to_string(),
            dependencies,
        });
    }
    children
}

/// Nodes that declare a `DEPENDS_ON` edge to the given node.
pub struct GetDependents {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
}

impl GetDependents {
    pub fn new(nodes: Arc<dyn NodeRepository>, edges: Arc<dyn EdgeRepository>) -> Self {
        Self { nodes, edges }
    }

    pub async fn execute(&self, node_id: &str) -> Result<Vec<NodeSummary>> {
        debug!(node = node_id, "Listing dependents");

        let incoming = self.edges.find_by_target(node_id).await?;
        let mut dependents = Vec::new();
        for edge in incoming
            .iter()
            .filter(|e| e.edge_type == EdgeType::DependsOn)
        {
            if let Some(node) = self.nodes.find_by_id(&edge.source_id).await? {
                dependents.push(node.summary());
            }
        }
        Ok(dependents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{component, depends_on, fixture};
    use archgraph_core::NodeType;

    fn all_ids(tree: &[DependencyTreeNode]) -> Vec<&str> {
        tree.iter().flat_map(|n| n.ids()).collect()
    }

    #[tokio::test]
    async fn depth_one_lists_direct_dependencies_without_children() {
        let repos = fixture(
            vec![component("a"), component("b"), component("c")],
            vec![depends_on("a", "b"), depends_on("b", "c")],
        );
        let tree = GetDependencyTree::new(repos.nodes.clone(), repos.edges.clone())
            .execute("a", 1)
            .await
            .unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "b");
        assert!(tree[0].dependencies.is_none());

        let json = serde_json::to_value(&tree).unwrap();
        assert!(json[0].get("dependencies").is_none());
    }

    #[tokio::test]
    async fn deeper_levels_nest_dependencies() {
        let repos = fixture(
            vec![component("a"), component("b"), component("c")],
            vec![depends_on("a", "b"), depends_on("b", "c")],
        );
        let tree = GetDependencyTree::new(repos.nodes.clone(), repos.edges.clone())
            .execute("a", 3)
            .await
            .unwrap();
        let b_deps = tree[0].dependencies.as_ref().unwrap();
        assert_eq!(b_deps[0].id, "c");
        assert_eq!(b_deps[0].dependencies.as_deref(), Some(&[][..]));
    }

    #[tokio::test]
    async fn diamond_is_expanded_once() {
        let repos = fixture(
            vec![component("a"), component("b"), component("c"), component("d")],
            vec![
                depends_on("a", "b"),
                depends_on("a", "c"),
                depends_on("b", "d"),
                depends_on("c", "d"),
            ],
        );
        let tree = GetDependencyTree::new(repos.nodes.clone(), repos.edges.clone())
            .execute("a", 5)
            .await
            .unwrap();

        let ids = all_ids(&tree);
        assert_eq!(ids, vec!["b", "d", "c"]);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[tokio::test]
    async fn cycles_do_not_revisit_the_root() {
        let repos = fixture(
            vec![component("a"), component("b")],
            vec![depends_on("a", "b"), depends_on("b", "a")],
        );
        let tree = GetDependencyTree::new(repos.nodes.clone(), repos.edges.clone())
            .execute("a", 10)
            .await
            .unwrap();
        assert_eq!(all_ids(&tree), vec!["b"]);
    }

    #[tokio::test]
    async fn zero_depth_and_unknown_nodes_are_empty() {
        let repos = fixture(
            vec![component("a"), component("b")],
            vec![depends_on("a", "b"), depends_on("a", "ghost")],
        );
        let use_case = GetDependencyTree::new(repos.nodes.clone(), repos.edges.clone());
        assert!(use_case.execute("a", 0).await.unwrap().is_empty());
        assert!(use_case.execute("nobody", 3).await.unwrap().is_empty());
        assert_eq!(all_ids(&use_case.execute("a", 1).await.unwrap()), vec!["b"]);
    }

    #[tokio::test]
    async fn dependents_follow_depends_on_only() {
        let mut layer = component("core");
        layer.node_type = NodeType::Layer;
        let repos = fixture(
            vec![layer, component("a"), component("b"), component("db")],
            vec![
                depends_on("a", "db"),
                depends_on("ghost", "db"),
                archgraph_core::Edge::new("b", "db", EdgeType::ReadsFrom),
                archgraph_core::Edge::contains("core", "db"),
            ],
        );
        let dependents = GetDependents::new(repos.nodes.clone(), repos.edges.clone())
            .execute("db")
            .await
            .unwrap();
        let ids: Vec<_> = dependents.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn ensure_node_exists_reports_missing_ids() {
        let repos = fixture(vec![component("a")], vec![]);
        assert!(ensure_node_exists(repos.nodes.as_ref(), "a").await.is_ok());
        assert!(matches!(
            ensure_node_exists(repos.nodes.as_ref(), "zz").await,
            Err(ArchGraphError::NodeNotFound(id)) if id == "zz"
        ));
    }
}
