//! Undirected traversals: shortest path and N-hop neighbourhood.
//!
//! Both treat every edge as bidirectional and walk adjacency in the order the
//! edge repository returns edges, which makes tie-breaking deterministic for a
//! fixed store.

use archgraph_core::{Edge, EdgeRef, EdgeRepository, Node, NodeRepository, NodeSummary, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// `node -> [(neighbour, edge index)]`, both directions, in edge order.
pub(crate) fn undirected_adjacency(edges: &[Edge]) -> HashMap<&str, Vec<(&str, usize)>> {
    let mut adjacency: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
    for (index, edge) in edges.iter().enumerate() {
        adjacency
            .entry(edge.source_id.as_str())
            .or_default()
            .push((edge.target_id.as_str(), index));
        adjacency
            .entry(edge.target_id.as_str())
            .or_default()
            .push((edge.source_id.as_str(), index));
    }
    adjacency
}

pub(crate) fn index_nodes(nodes: Vec<Node>) -> HashMap<String, Node> {
    nodes.into_iter().map(|n| (n.id.clone(), n)).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortestPath {
    pub path: Vec<NodeSummary>,
    pub edges: Vec<Edge>,
}

impl ShortestPath {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// Fewest-hop path between two nodes, ignoring edge direction.
pub struct GetShortestPath {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
}

impl GetShortestPath {
    pub fn new(nodes: Arc<dyn NodeRepository>, edges: Arc<dyn EdgeRepository>) -> Self {
        Self { nodes, edges }
    }

    pub async fn execute(&self, from_id: &str, to_id: &str) -> Result<ShortestPath> {
        debug!(from = from_id, to = to_id, "Computing shortest path");

        if from_id == to_id {
            return Ok(match self.nodes.find_by_id(from_id).await? {
                Some(node) => ShortestPath {
                    path: vec![node.summary()],
                    edges: Vec::new(),
                },
                None => ShortestPath::default(),
            });
        }

        let edges = self.edges.find_all().await?;
        let adjacency = undirected_adjacency(&edges);

        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        let mut parent: HashMap<&str, (&str, usize)> = HashMap::new();

        queue.push_back(from_id);
        visited.insert(from_id);

        let mut found = false;
        while let Some(current) = queue.pop_front() {
            if current == to_id {
                found = true;
                break;
            }
            let Some(neighbours) = adjacency.get(current) else {
                continue;
            };
            for &(neighbour, edge_index) in neighbours {
                if visited.insert(neighbour) {
                    parent.insert(neighbour, (current, edge_index));
                    queue.push_back(neighbour);
                }
            }
        }

        if !found {
            return Ok(ShortestPath::default());
        }

        let mut hops = Vec::new();
        let mut ids = vec![to_id];
        let mut cursor = to_id;
        while let Some(&(previous, edge_index)) = parent.get(cursor) {
            hops.push(edge_index);
            ids.push(previous);
            cursor = previous;
        }
        ids.reverse();
        hops.reverse();

        let nodes = index_nodes(self.nodes.find_all().await?);
        let path = ids
            .into_iter()
            .map(|id| {
                nodes
                    .get(id)
                    .map(Node::summary)
                    .unwrap_or_else(|| NodeSummary::unknown(id))
            })
            .collect();
        let edges = hops.into_iter().map(|i| edges[i].clone()).collect();

        Ok(ShortestPath { path, edges })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighbourhood {
    pub nodes: Vec<NodeSummary>,
    pub edges: Vec<EdgeRef>,
}

/// Induced subgraph on every node within `hops` undirected steps of a node.
pub struct GetNeighbourhood {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
}

impl GetNeighbourhood {
    pub fn new(nodes: Arc<dyn NodeRepository>, edges: Arc<dyn EdgeRepository>) -> Self {
        Self { nodes, edges }
    }

    pub async fn execute(&self, node_id: &str, hops: usize) -> Result<Neighbourhood> {
        debug!(node = node_id, hops, "Computing neighbourhood");

        let edges = self.edges.find_all().await?;
        let adjacency = undirected_adjacency(&edges);

        let mut order = vec![node_id];
        let mut visited: HashSet<&str> = HashSet::from([node_id]);
        let mut frontier = vec![node_id];

        for _ in 0..hops {
            let mut next = Vec::new();
            for current in frontier {
                for &(neighbour, _) in adjacency.get(current).into_iter().flatten() {
                    if visited.insert(neighbour) {
                        order.push(neighbour);
                        next.push(neighbour);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let nodes = index_nodes(self.nodes.find_all().await?);
        let summaries = order
            .iter()
            .filter_map(|id| nodes.get(*id).map(Node::summary))
            .collect();
        // Zero hops reports the start node alone, without its self-loop.
        let induced = edges
            .iter()
            .filter(|e| {
                hops > 0
                    && visited.contains(e.source_id.as_str())
                    && visited.contains(e.target_id.as_str())
            })
            .map(Edge::to_ref)
            .collect();

        Ok(Neighbourhood {
            nodes: summaries,
            edges: induced,
        })
    }
}
