use crate::{
    ApiKey, ApiKeyRepository, ArchGraphError, Edge, EdgeRepository, Feature, FeatureRepository,
    InMemoryApiKeyRepository, InMemoryEdgeRepository, InMemoryFeatureRepository,
    InMemoryNodeRepository, InMemoryVersionRepository, Node, NodeRepository, Result, Version,
    VersionRepository,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Serialized state of every store, used to seed and dump in-memory repositories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// The set of repositories a use case can draw from.
#[derive(Clone)]
pub struct Repositories {
    pub nodes: Arc<dyn NodeRepository>,
    pub edges: Arc<dyn EdgeRepository>,
    pub versions: Arc<dyn VersionRepository>,
    pub features: Arc<dyn FeatureRepository>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        debug!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            versions = snapshot.versions.len(),
            features = snapshot.features.len(),
            "Seeding in-memory repositories"
        );
        Self {
            nodes: Arc::new(InMemoryNodeRepository::with_nodes(snapshot.nodes)),
            edges: Arc::new(InMemoryEdgeRepository::with_edges(snapshot.edges)),
            versions: Arc::new(InMemoryVersionRepository::with_versions(snapshot.versions)),
            features: Arc::new(InMemoryFeatureRepository::with_features(snapshot.features)),
            api_keys: Arc::new(InMemoryApiKeyRepository::with_keys(snapshot.api_keys)),
        }
    }

    /// Loads `path` when given, otherwise starts empty.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Ok(Self::from_snapshot(Snapshot::load(path)?)),
            Some(path) => Err(ArchGraphError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("snapshot not found: {}", path.display()),
            ))),
            None => Ok(Self::in_memory()),
        }
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            nodes: self.nodes.find_all().await?,
            edges: self.edges.find_all().await?,
            versions: self.versions.find_all().await?,
            features: self.features.find_all().await?,
            api_keys: self.api_keys.find_all().await?,
        })
    }
}
