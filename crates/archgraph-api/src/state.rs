use archgraph_core::{ArchGraphConfig, Repositories};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub config: Arc<ArchGraphConfig>,
}

impl AppState {
    pub fn new(repos: Repositories, config: ArchGraphConfig) -> Self {
        Self {
            repos,
            config: Arc::new(config),
        }
    }

    /// Empty in-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::new(Repositories::in_memory(), ArchGraphConfig::default())
    }

    pub fn auth_enabled(&self) -> bool {
        self.config.auth.enabled
    }

    pub fn default_tags(&self) -> Vec<String> {
        self.config.versions.default_tags.clone()
    }
}
