//! Write-side use cases: layers, components, edges, versions and features.
//!
//! Each use case validates its input against the current store before
//! writing, so callers only ever see whole operations or a typed error.

use archgraph_core::{
    ArchGraphError, Edge, EdgeId, EdgeType, Feature, Node, NodeRepository, NodeType,
    Repositories, Result, Version, VersionStatus, DEFAULT_VERSION_TAGS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

const FEATURE_EXTENSION: &str = ".feature";

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ArchGraphError::Validation("name must not be empty".into()));
    }
    Ok(())
}

/// A new node id must be kebab-case and not yet taken.
async fn require_new_id(nodes: &dyn NodeRepository, id: &str) -> Result<()> {
    if !Node::is_valid_id(id) {
        return Err(ArchGraphError::Validation(format!(
            "id '{}' must be kebab-case",
            id
        )));
    }
    if nodes.exists(id).await? {
        return Err(ArchGraphError::Conflict(format!("node '{}' already exists", id)));
    }
    Ok(())
}

async fn require_node(nodes: &dyn NodeRepository, id: &str) -> Result<Node> {
    nodes
        .find_by_id(id)
        .await?
        .ok_or_else(|| ArchGraphError::NodeNotFound(id.to_string()))
}

async fn require_layer(nodes: &dyn NodeRepository, id: &str) -> Result<Node> {
    let layer = require_node(nodes, id).await?;
    if !layer.is_layer() {
        return Err(ArchGraphError::Validation(format!(
            "'{}' is a {}, not a layer",
            id, layer.node_type
        )));
    }
    Ok(layer)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLayer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

pub struct CreateLayer {
    repos: Repositories,
}

impl CreateLayer {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(&self, input: NewLayer) -> Result<Node> {
        require_new_id(self.repos.nodes.as_ref(), &input.id).await?;
        require_name(&input.name)?;

        let mut layer =
            Node::new(input.id, input.name, NodeType::Layer).with_sort_order(input.sort_order);
        layer.color = input.color;
        layer.icon = input.icon;
        layer.description = input.description;

        self.repos.nodes.save(layer.clone()).await?;
        info!(layer = %layer.id, "Created layer");
        Ok(layer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewComponent {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub node_type: Option<NodeType>,
    #[serde(default)]
    pub layer: Option<String>,
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

/// Creates a non-layer node, its `CONTAINS` edge and one version record per
/// default tag.
pub struct CreateComponent {
    repos: Repositories,
    default_tags: Vec<String>,
}

impl CreateComponent {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            default_tags: DEFAULT_VERSION_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_default_tags(mut self, tags: Vec<String>) -> Self {
        self.default_tags = tags;
        self
    }

    pub async fn execute(&self, input: NewComponent) -> Result<Node> {
        let nodes = self.repos.nodes.as_ref();
        require_new_id(nodes, &input.id).await?;
        require_name(&input.name)?;

        let node_type = input.node_type.unwrap_or_default();
        if node_type == NodeType::Layer {
            return Err(ArchGraphError::Validation(
                "layers are created through the layer endpoint".into(),
            ));
        }
        if let Some(layer_id) = input.layer.as_deref() {
            require_layer(nodes, layer_id).await?;
        }

        let node = Node {
            id: input.id,
            name: input.name,
            node_type,
            layer: input.layer,
            color: input.color,
            icon: input.icon,
            description: input.description,
            tags: input.tags,
            sort_order: input.sort_order,
            current_version: input.current_version,
        };
        nodes.save(node.clone()).await?;

        if let Some(layer_id) = node.layer.as_deref() {
            self.repos
                .edges
                .save(Edge::contains(layer_id, node.id.as_str()))
                .await?;
        }

        for tag in &self.default_tags {
            let version = Version::derived(
                node.id.as_str(),
                tag.as_str(),
                node.current_version.as_deref(),
            );
            self.repos.versions.save(version).await?;
        }

        info!(
            component = %node.id,
            node_type = %node.node_type,
            versions = self.default_tags.len(),
            "Created component"
        );
        Ok(node)
    }
}

/// Fields of a component that may be changed in place. Absent fields are
/// left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub current_version: Option<String>,
}

pub struct UpdateComponent {
    repos: Repositories,
}

impl UpdateComponent {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(&self, id: &str, patch: ComponentPatch) -> Result<Node> {
        let mut node = require_node(self.repos.nodes.as_ref(), id).await?;

        if let Some(name) = patch.name {
            require_name(&name)?;
            node.name = name;
        }
        if let Some(color) = patch.color {
            node.color = Some(color);
        }
        if let Some(icon) = patch.icon {
            node.icon = Some(icon);
        }
        if let Some(description) = patch.description {
            node.description = Some(description);
        }
        if let Some(tags) = patch.tags {
            node.tags = tags;
        }
        if let Some(sort_order) = patch.sort_order {
            node.sort_order = sort_order;
        }

        let version_changed = match patch.current_version {
            Some(current) if node.current_version.as_deref() != Some(current.as_str()) => {
                node.current_version = Some(current);
                true
            }
            _ => false,
        };

        self.repos.nodes.save(node.clone()).await?;

        if version_changed {
            let mut recalculated = 0usize;
            for mut version in self.repos.versions.find_by_node(id).await? {
                if version.recalculate(node.current_version.as_deref()) {
                    self.repos.versions.save(version).await?;
                    recalculated += 1;
                }
            }
            debug!(component = id, recalculated, "Recalculated phase versions");
        }

        info!(component = id, version_changed, "Updated component");
        Ok(node)
    }
}

pub struct MoveComponent {
    repos: Repositories,
}

impl MoveComponent {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(&self, id: &str, new_layer: &str) -> Result<Node> {
        let nodes = self.repos.nodes.as_ref();
        let mut node = require_node(nodes, id).await?;
        if node.is_layer() {
            return Err(ArchGraphError::Validation(format!(
                "'{}' is a layer and cannot be moved",
                id
            )));
        }
        require_layer(nodes, new_layer).await?;

        for edge in self.repos.edges.find_by_target(id).await? {
            if edge.edge_type != EdgeType::Contains {
                continue;
            }
            if let Some(edge_id) = edge.id {
                self.repos.edges.delete(edge_id).await?;
            }
        }
        self.repos.edges.save(Edge::contains(new_layer, id)).await?;

        let previous = node.layer.replace(new_layer.to_string());
        nodes.save(node.clone()).await?;

        info!(
            component = id,
            from = previous.as_deref().unwrap_or("-"),
            to = new_layer,
            "Moved component"
        );
        Ok(node)
    }
}

/// What a cascading delete removed alongside the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedComponent {
    pub id: String,
    pub versions: usize,
    pub features: usize,
    pub edges: usize,
}

pub struct DeleteComponent {
    repos: Repositories,
}

impl DeleteComponent {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(&self, id: &str) -> Result<DeletedComponent> {
        require_node(self.repos.nodes.as_ref(), id).await?;

        let versions = self.repos.versions.delete_by_node(id).await?;
        let features = self.repos.features.delete_by_node(id).await?;

        let mut incident: HashSet<EdgeId> = HashSet::new();
        let outgoing = self.repos.edges.find_by_source(id).await?;
        let incoming = self.repos.edges.find_by_target(id).await?;
        incident.extend(outgoing.iter().chain(&incoming).filter_map(|e| e.id));

        let mut edges = 0;
        for edge_id in incident {
            if self.repos.edges.delete(edge_id).await? {
                edges += 1;
            }
        }

        self.repos.nodes.delete(id).await?;
        info!(component = id, versions, features, edges, "Deleted component");

        Ok(DeletedComponent {
            id: id.to_string(),
            versions,
            features,
            edges,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

pub struct CreateEdge {
    repos: Repositories,
}

impl CreateEdge {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(&self, input: NewEdge) -> Result<Edge> {
        if input.source_id == input.target_id {
            return Err(ArchGraphError::Validation(format!(
                "edge from '{}' to itself",
                input.source_id
            )));
        }
        let nodes = self.repos.nodes.as_ref();
        require_node(nodes, &input.source_id).await?;
        require_node(nodes, &input.target_id).await?;

        let mut edge = Edge::new(input.source_id, input.target_id, input.edge_type);
        edge.label = input.label;
        edge.metadata = input.metadata;

        let existing = self.repos.edges.find_by_source(&edge.source_id).await?;
        if existing.iter().any(|e| e.same_relation(&edge)) {
            return Err(ArchGraphError::Conflict(format!(
                "{} edge {} -> {} already exists",
                edge.edge_type, edge.source_id, edge.target_id
            )));
        }

        let saved = self.repos.edges.save(edge).await?;
        info!(
            id = saved.id,
            source = %saved.source_id,
            target = %saved.target_id,
            edge_type = %saved.edge_type,
            "Created edge"
        );
        Ok(saved)
    }
}

pub struct DeleteEdge {
    repos: Repositories,
}

impl DeleteEdge {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(&self, id: EdgeId) -> Result<()> {
        if !self.repos.edges.delete(id).await? {
            return Err(ArchGraphError::EdgeNotFound(id.to_string()));
        }
        info!(id, "Deleted edge");
        Ok(())
    }
}

/// Manual changes to one version record. A progress without a status
/// derives the status from the progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionUpdate {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub progress: Option<u16>,
    #[serde(default)]
    pub status: Option<VersionStatus>,
}

pub struct UpdateVersion {
    repos: Repositories,
}

impl UpdateVersion {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(
        &self,
        node_id: &str,
        tag: &str,
        update: VersionUpdate,
    ) -> Result<Version> {
        require_node(self.repos.nodes.as_ref(), node_id).await?;
        if tag.trim().is_empty() {
            return Err(ArchGraphError::Validation("version tag must not be empty".into()));
        }
        let progress = update
            .progress
            .map(|progress| match u8::try_from(progress) {
                Ok(progress) if progress <= 100 => Ok(progress),
                _ => Err(ArchGraphError::Validation(format!(
                    "progress {} is above 100",
                    progress
                ))),
            })
            .transpose()?;

        let mut version = self
            .repos
            .versions
            .find_by_node_and_version(node_id, tag)
            .await?
            .unwrap_or_else(|| Version::new(node_id, tag));

        if let Some(content) = update.content {
            version.content = Some(content);
        }
        if let Some(progress) = progress {
            version.apply_progress(progress);
        }
        if let Some(status) = update.status {
            version.status = status;
        }
        version.updated_at = chrono::Utc::now();

        self.repos.versions.save(version.clone()).await?;
        info!(
            node = node_id,
            version = tag,
            progress = version.progress,
            status = %version.status,
            "Updated version"
        );
        Ok(version)
    }
}

pub struct UploadFeature {
    repos: Repositories,
}

impl UploadFeature {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(
        &self,
        node_id: &str,
        tag: &str,
        filename: &str,
        content: &str,
    ) -> Result<Feature> {
        require_node(self.repos.nodes.as_ref(), node_id).await?;
        let stem = filename.strip_suffix(FEATURE_EXTENSION).unwrap_or("");
        if stem.trim().is_empty() {
            return Err(ArchGraphError::Validation(format!(
                "feature filename '{}' must end in {}",
                filename, FEATURE_EXTENSION
            )));
        }

        let feature = Feature::parse(node_id, tag, filename, content);
        self.repos.features.save(feature.clone()).await?;
        info!(
            node = node_id,
            version = tag,
            filename,
            steps = feature.step_count,
            "Uploaded feature"
        );
        Ok(feature)
    }
}

pub struct DeleteFeature {
    repos: Repositories,
}

impl DeleteFeature {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Removes the file from every version tag of the node.
    pub async fn execute(&self, node_id: &str, filename: &str) -> Result<usize> {
        require_node(self.repos.nodes.as_ref(), node_id).await?;
        let removed = self
            .repos
            .features
            .delete_by_node_and_filename(node_id, filename)
            .await?;
        info!(node = node_id, filename, removed, "Deleted feature");
        Ok(removed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDetail {
    #[serde(flatten)]
    pub node: Node,
    pub versions: Vec<Version>,
    pub features: Vec<Feature>,
}

pub struct GetComponent {
    repos: Repositories,
}

impl GetComponent {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn execute(&self, id: &str) -> Result<ComponentDetail> {
        let node = require_node(self.repos.nodes.as_ref(), id).await?;
        let versions = self.repos.versions.find_by_node(id).await?;
        let features = self.repos.features.find_by_node(id).await?;
        Ok(ComponentDetail {
            node,
            versions,
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{component, fixture, layer};

    fn new_component(id: &str) -> NewComponent {
        NewComponent {
            id: id.to_string(),
            name: id.to_uppercase(),
            ..NewComponent::default()
        }
    }

    fn progress_by_tag(versions: &[Version]) -> Vec<(String, u8)> {
        versions
            .iter()
            .map(|v| (v.version.clone(), v.progress))
            .collect()
    }

    #[tokio::test]
    async fn create_component_seeds_versions_and_containment() {
        let repos = fixture(vec![layer("core")], vec![]);
        let node = CreateComponent::new(repos.clone())
            .execute(NewComponent {
                layer: Some("core".into()),
                current_version: Some("0.7.5".into()),
                ..new_component("auth")
            })
            .await
            .unwrap();
        assert_eq!(node.node_type, NodeType::Component);

        let versions = repos.versions.find_by_node("auth").await.unwrap();
        assert_eq!(
            progress_by_tag(&versions),
            vec![
                ("overview".to_string(), 0),
                ("mvp".to_string(), 75),
                ("v1".to_string(), 0),
                ("v2".to_string(), 0),
            ]
        );

        let contains = repos.edges.find_by_type(EdgeType::Contains).await.unwrap();
        assert_eq!(contains.len(), 1);
        assert_eq!(contains[0].source_id, "core");
        assert_eq!(contains[0].target_id, "auth");
    }

    #[tokio::test]
    async fn create_component_honours_configured_tags() {
        let repos = fixture(vec![], vec![]);
        CreateComponent::new(repos.clone())
            .with_default_tags(vec!["mvp".into()])
            .execute(new_component("solo"))
            .await
            .unwrap();
        assert_eq!(repos.versions.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_component_validates_input() {
        let repos = fixture(vec![layer("core"), component("taken")], vec![]);
        let use_case = CreateComponent::new(repos.clone());

        let bad_id = use_case.execute(new_component("Not Kebab")).await;
        assert!(matches!(bad_id, Err(ArchGraphError::Validation(_))));

        let duplicate = use_case.execute(new_component("taken")).await;
        assert!(matches!(duplicate, Err(ArchGraphError::Conflict(_))));

        let unnamed = use_case
            .execute(NewComponent {
                name: "  ".into(),
                ..new_component("blank")
            })
            .await;
        assert!(matches!(unnamed, Err(ArchGraphError::Validation(_))));

        let missing_layer = use_case
            .execute(NewComponent {
                layer: Some("nowhere".into()),
                ..new_component("lost")
            })
            .await;
        assert!(matches!(missing_layer, Err(ArchGraphError::NodeNotFound(_))));

        let not_a_layer = use_case
            .execute(NewComponent {
                layer: Some("taken".into()),
                ..new_component("child")
            })
            .await;
        assert!(matches!(not_a_layer, Err(ArchGraphError::Validation(_))));

        let layer_type = use_case
            .execute(NewComponent {
                node_type: Some(NodeType::Layer),
                ..new_component("sneaky")
            })
            .await;
        assert!(matches!(layer_type, Err(ArchGraphError::Validation(_))));
    }

    #[tokio::test]
    async fn create_layer_rejects_duplicates() {
        let repos = fixture(vec![], vec![]);
        let use_case = CreateLayer::new(repos.clone());
        let input = NewLayer {
            id: "core".into(),
            name: "Core".into(),
            sort_order: 3,
            ..NewLayer::default()
        };
        let created = use_case.execute(input.clone()).await.unwrap();
        assert!(created.is_layer());
        assert_eq!(created.sort_order, 3);
        assert!(matches!(
            use_case.execute(input).await,
            Err(ArchGraphError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_recalculates_phase_versions_only_on_change() {
        let repos = fixture(vec![], vec![]);
        CreateComponent::new(repos.clone())
            .execute(NewComponent {
                current_version: Some("0.2.0".into()),
                ..new_component("auth")
            })
            .await
            .unwrap();
        UpdateVersion::new(repos.clone())
            .execute(
                "auth",
                "overview",
                VersionUpdate {
                    content: Some("notes".into()),
                    ..VersionUpdate::default()
                },
            )
            .await
            .unwrap();

        let updated = UpdateComponent::new(repos.clone())
            .execute(
                "auth",
                ComponentPatch {
                    current_version: Some("1.3.0".into()),
                    description: Some("login service".into()),
                    ..ComponentPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("login service"));
        assert_eq!(updated.name, "AUTH");

        let versions = repos.versions.find_by_node("auth").await.unwrap();
        assert_eq!(
            progress_by_tag(&versions),
            vec![
                ("overview".to_string(), 0),
                ("mvp".to_string(), 100),
                ("v1".to_string(), 30),
                ("v2".to_string(), 0),
            ]
        );
        assert_eq!(versions[0].content.as_deref(), Some("notes"));
        assert_eq!(versions[1].status, VersionStatus::Complete);
    }

    #[tokio::test]
    async fn update_missing_component_is_not_found() {
        let repos = fixture(vec![], vec![]);
        let result = UpdateComponent::new(repos)
            .execute("ghost", ComponentPatch::default())
            .await;
        assert!(matches!(result, Err(ArchGraphError::NodeNotFound(_))));
    }

    #[tokio::test]
    async fn move_replaces_containment() {
        let repos = fixture(
            vec![
                layer("core"),
                layer("infra"),
                component("db").with_layer("core"),
            ],
            vec![Edge::contains("core", "db")],
        );
        let moved = MoveComponent::new(repos.clone())
            .execute("db", "infra")
            .await
            .unwrap();
        assert_eq!(moved.layer.as_deref(), Some("infra"));

        let contains = repos.edges.find_by_type(EdgeType::Contains).await.unwrap();
        assert_eq!(contains.len(), 1);
        assert_eq!(contains[0].source_id, "infra");

        let stored = repos.nodes.find_by_id("db").await.unwrap().unwrap();
        assert_eq!(stored.layer.as_deref(), Some("infra"));
    }

    #[tokio::test]
    async fn move_rejects_layers_and_non_layer_targets() {
        let repos = fixture(vec![layer("core"), component("a"), component("b")], vec![]);
        let use_case = MoveComponent::new(repos);
        assert!(matches!(
            use_case.execute("core", "core").await,
            Err(ArchGraphError::Validation(_))
        ));
        assert!(matches!(
            use_case.execute("a", "b").await,
            Err(ArchGraphError::Validation(_))
        ));
        assert!(matches!(
            use_case.execute("a", "nowhere").await,
            Err(ArchGraphError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades() {
        let repos = fixture(vec![layer("core")], vec![]);
        for id in ["a", "b"] {
            CreateComponent::new(repos.clone())
                .execute(NewComponent {
                    layer: Some("core".into()),
                    ..new_component(id)
                })
                .await
                .unwrap();
        }
        let create_edge = CreateEdge::new(repos.clone());
        for (source, target) in [("a", "b"), ("b", "a")] {
            create_edge
                .execute(NewEdge {
                    source_id: source.into(),
                    target_id: target.into(),
                    edge_type: EdgeType::DependsOn,
                    label: None,
                    metadata: None,
                })
                .await
                .unwrap();
        }
        UploadFeature::new(repos.clone())
            .execute("a", "mvp", "login.feature", "Feature: Login\nGiven x\n")
            .await
            .unwrap();

        let deleted = DeleteComponent::new(repos.clone()).execute("a").await.unwrap();
        assert_eq!(
            deleted,
            DeletedComponent {
                id: "a".into(),
                versions: 4,
                features: 1,
                edges: 3,
            }
        );

        assert!(!repos.nodes.exists("a").await.unwrap());
        assert!(repos.versions.find_by_node("a").await.unwrap().is_empty());
        assert!(repos.edges.find_all().await.unwrap().iter().all(|e| !e.touches("a")));
        assert_eq!(repos.versions.find_by_node("b").await.unwrap().len(), 4);

        assert!(matches!(
            DeleteComponent::new(repos).execute("a").await,
            Err(ArchGraphError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_edge_rejects_loops_duplicates_and_unknown_endpoints() {
        let repos = fixture(vec![component("a"), component("b")], vec![]);
        let use_case = CreateEdge::new(repos);
        let edge = |source: &str, target: &str| NewEdge {
            source_id: source.into(),
            target_id: target.into(),
            edge_type: EdgeType::ReadsFrom,
            label: Some("reads".into()),
            metadata: None,
        };

        let saved = use_case.execute(edge("a", "b")).await.unwrap();
        assert!(saved.id.is_some());
        assert_eq!(saved.label.as_deref(), Some("reads"));

        assert!(matches!(
            use_case.execute(edge("a", "a")).await,
            Err(ArchGraphError::Validation(_))
        ));
        assert!(matches!(
            use_case.execute(edge("a", "b")).await,
            Err(ArchGraphError::Conflict(_))
        ));
        assert!(matches!(
            use_case.execute(edge("a", "ghost")).await,
            Err(ArchGraphError::NodeNotFound(id)) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn delete_edge_reports_unknown_ids() {
        let repos = fixture(
            vec![component("a"), component("b")],
            vec![Edge::new("a", "b", EdgeType::Controls)],
        );
        let edge_id = repos.edges.find_all().await.unwrap()[0].id.unwrap();
        let use_case = DeleteEdge::new(repos.clone());

        use_case.execute(edge_id).await.unwrap();
        assert!(repos.edges.find_all().await.unwrap().is_empty());
        assert!(matches!(
            use_case.execute(edge_id).await,
            Err(ArchGraphError::EdgeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_version_derives_status_from_progress() {
        let repos = fixture(vec![component("a")], vec![]);
        let use_case = UpdateVersion::new(repos.clone());

        let version = use_case
            .execute(
                "a",
                "mvp",
                VersionUpdate {
                    progress: Some(60),
                    ..VersionUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(version.status, VersionStatus::InProgress);

        let forced = use_case
            .execute(
                "a",
                "mvp",
                VersionUpdate {
                    progress: Some(60),
                    status: Some(VersionStatus::Complete),
                    ..VersionUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(forced.status, VersionStatus::Complete);
        assert_eq!(repos.versions.find_by_node("a").await.unwrap().len(), 1);

        assert!(matches!(
            use_case
                .execute(
                    "a",
                    "mvp",
                    VersionUpdate {
                        progress: Some(101),
                        ..VersionUpdate::default()
                    },
                )
                .await,
            Err(ArchGraphError::Validation(_))
        ));
        assert!(matches!(
            use_case
                .execute(
                    "a",
                    "mvp",
                    VersionUpdate {
                        progress: Some(300),
                        ..VersionUpdate::default()
                    },
                )
                .await,
            Err(ArchGraphError::Validation(_))
        ));
        assert!(matches!(
            use_case.execute("ghost", "mvp", VersionUpdate::default()).await,
            Err(ArchGraphError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn upload_feature_parses_and_upserts() {
        let repos = fixture(vec![component("a")], vec![]);
        let use_case = UploadFeature::new(repos.clone());

        let first = use_case
            .execute("a", "mvp", "login.feature", "Feature: Login\nGiven a\nWhen b\n")
            .await
            .unwrap();
        assert_eq!(first.title, "Login");
        assert_eq!(first.step_count, 2);

        let second = use_case
            .execute("a", "mvp", "login.feature", "Given a\nWhen b\nThen c\nAnd d\n")
            .await
            .unwrap();
        assert_eq!(second.title, "login");
        assert_eq!(second.step_count, 4);
        assert_eq!(repos.features.find_by_node("a").await.unwrap().len(), 1);

        for bad in ["", "login.txt", ".feature"] {
            assert!(matches!(
                use_case.execute("a", "mvp", bad, "Given a").await,
                Err(ArchGraphError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn delete_feature_and_get_component() {
        let repos = fixture(vec![component("a")], vec![]);
        UploadFeature::new(repos.clone())
            .execute("a", "mvp", "login.feature", "Given a")
            .await
            .unwrap();
        UploadFeature::new(repos.clone())
            .execute("a", "v1", "search.feature", "Given a")
            .await
            .unwrap();

        let removed = DeleteFeature::new(repos.clone())
            .execute("a", "login.feature")
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let detail = GetComponent::new(repos.clone()).execute("a").await.unwrap();
        assert_eq!(detail.node.id, "a");
        assert_eq!(detail.features.len(), 1);
        assert_eq!(detail.features[0].filename, "search.feature");

        assert!(matches!(
            GetComponent::new(repos).execute("ghost").await,
            Err(ArchGraphError::NodeNotFound(_))
        ));
    }
}
