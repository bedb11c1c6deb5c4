use archgraph_core::{Edge, EdgeRepository, EdgeType, Node, NodeRepository, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Non-layer node ids in store order, plus the `DEPENDS_ON` edges among them.
fn component_graph<'a>(nodes: &'a [Node], edges: &'a [Edge]) -> (Vec<&'a str>, Vec<&'a Edge>) {
    let ids: Vec<&str> = nodes
        .iter()
        .filter(|n| !n.is_layer())
        .map(|n| n.id.as_str())
        .collect();
    let members: HashSet<&str> = ids.iter().copied().collect();
    let dependencies = edges
        .iter()
        .filter(|e| {
            e.edge_type == EdgeType::DependsOn
                && members.contains(e.source_id.as_str())
                && members.contains(e.target_id.as_str())
        })
        .collect();
    (ids, dependencies)
}

/// Either a full build order or the nodes that could not be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImplementationOrder {
    Order { order: Vec<String> },
    Cycle { cycle: Vec<String> },
}

impl ImplementationOrder {
    pub fn order(&self) -> Option<&[String]> {
        match self {
            ImplementationOrder::Order { order } => Some(order),
            ImplementationOrder::Cycle { .. } => None,
        }
    }

    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            ImplementationOrder::Cycle { cycle } => Some(cycle),
            ImplementationOrder::Order { .. } => None,
        }
    }
}

/// Topological order of components by `DEPENDS_ON`: a dependency always
/// precedes the nodes that depend on it.
///
/// When a cycle blocks the sort, every node left unordered is reported. That
/// includes nodes merely downstream of the cycle; [`GetDependencyCycles`]
/// gives the exact cycle members.
pub struct GetImplementationOrder {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
}

impl GetImplementationOrder {
    pub fn new(nodes: Arc<dyn NodeRepository>, edges: Arc<dyn EdgeRepository>) -> Self {
        Self { nodes, edges }
    }

    pub async fn execute(&self) -> Result<ImplementationOrder> {
        let nodes = self.nodes.find_all().await?;
        let edges = self.edges.find_all().await?;
        let (components, dependencies) = component_graph(&nodes, &edges);

        let mut in_degree: HashMap<&str, usize> = components.iter().map(|&id| (id, 0)).collect();
        let mut unblocks: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &dependencies {
            *in_degree.entry(edge.source_id.as_str()).or_default() += 1;
            unblocks
                .entry(edge.target_id.as_str())
                .or_default()
                .push(edge.source_id.as_str());
        }

        let mut queue: VecDeque<&str> = components
            .iter()
            .copied()
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut order = Vec::with_capacity(components.len());

        while let Some(current) = queue.pop_front() {
            order.push(current.to_string());
            for &dependent in unblocks.get(current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if order.len() < components.len() {
            let ordered: HashSet<&str> = order.iter().map(String::as_str).collect();
            let cycle: Vec<String> = components
                .iter()
                .filter(|id| !ordered.contains(*id))
                .map(|id| id.to_string())
                .collect();
            warn!(unordered = cycle.len(), "Dependency cycle blocks implementation order");
            return Ok(ImplementationOrder::Cycle { cycle });
        }

        debug!(components = order.len(), "Computed implementation order");
        Ok(ImplementationOrder::Order { order })
    }
}

/// Strongly connected components of the component dependency graph that form
/// cycles, found with Tarjan's algorithm.
pub struct GetDependencyCycles {
    nodes: Arc<dyn NodeRepository>,
    edges: Arc<dyn EdgeRepository>,
}

impl GetDependencyCycles {
    pub fn new(nodes: Arc<dyn NodeRepository>, edges: Arc<dyn EdgeRepository>) -> Self {
        Self { nodes, edges }
    }

    pub async fn execute(&self) -> Result<Vec<Vec<String>>> {
        let nodes = self.nodes.find_all().await?;
        let edges = self.edges.find_all().await?;
        let (components, dependencies) = component_graph(&nodes, &edges);

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &dependencies {
            adjacency
                .entry(edge.source_id.as_str())
                .or_default()
                .push(edge.target_id.as_str());
        }

        let mut tarjan = Tarjan::new(&adjacency);
        for &id in &components {
            if !tarjan.indices.contains_key(id) {
                tarjan.visit(id);
            }
        }

        let position: HashMap<&str, usize> =
            components.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut cycles: Vec<Vec<String>> = tarjan
            .components
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|mut scc| {
                scc.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));
                scc.into_iter().map(str::to_string).collect()
            })
            .collect();
        cycles.sort_by_key(|scc| position.get(scc[0].as_str()).copied().unwrap_or(usize::MAX));
        Ok(cycles)
    }
}

struct Tarjan<'g, 'a> {
    adjacency: &'g HashMap<&'a str, Vec<&'a str>>,
    index_counter: usize,
    stack: Vec<&'a str>,
    indices: HashMap<&'a str, usize>,
    lowlinks: HashMap<&'a str, usize>,
    on_stack: HashSet<&'a str>,
    components: Vec<Vec<&'a str>>,
}

impl<'g, 'a> Tarjan<'g, 'a> {
    fn new(adjacency: &'g HashMap<&'a str, Vec<&'a str>>) -> Self {
        Self {
            adjacency,
            index_counter: 0,
            stack: Vec::new(),
            indices: HashMap::new(),
            lowlinks: HashMap::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, node: &'a str) {
        self.indices.insert(node, self.index_counter);
        self.lowlinks.insert(node, self.index_counter);
        self.index_counter += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let adjacency = self.adjacency;
        for &neighbour in adjacency.get(node).into_iter().flatten() {
            if !self.indices.contains_key(neighbour) {
                self.visit(neighbour);
                let low = self.lowlinks[node].min(self.lowlinks[neighbour]);
                self.lowlinks.insert(node, low);
            } else if self.on_stack.contains(neighbour) {
                let low = self.lowlinks[node].min(self.indices[neighbour]);
                self.lowlinks.insert(node, low);
            }
        }

        if self.lowlinks[node] == self.indices[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
