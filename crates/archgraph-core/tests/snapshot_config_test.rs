use archgraph_core::{
    ConfigError, ConfigManager, Edge, EdgeType, Feature, Node, NodeType, Repositories, Snapshot,
    Version,
};
use tempfile::TempDir;

const OWNER_METADATA: &str = r#"{"owner":"platform"}"#;

fn sample_snapshot() -> Snapshot {
    Snapshot {
        nodes: vec![
            Node::new("core", "Core", NodeType::Layer),
            Node::new("auth", "Auth", NodeType::Component)
                .with_layer("core")
                .with_description("Session and token issuing")
                .with_tags(vec!["security".into()])
                .with_current_version("0.3.0"),
        ],
        edges: vec![Edge::contains("core", "auth").with_metadata(OWNER_METADATA)],
        versions: vec![Version::derived("auth", "mvp", Some("0.3.0"))],
        features: vec![Feature::parse(
            "auth",
            "mvp",
            "login.feature",
            "Feature: Login\n  Given a user\n  Then a session",
        )],
        api_keys: vec![],
    }
}

#[tokio::test]
async fn snapshot_round_trips_through_repositories() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("data").join("graph.json");
    sample_snapshot().save(&path).unwrap();

    let repos = Repositories::open(Some(&path)).unwrap();
    assert_eq!(repos.nodes.find_all().await.unwrap().len(), 2);
    let auth = repos.nodes.find_by_id("auth").await.unwrap().unwrap();
    assert_eq!(auth.description.as_deref(), Some("Session and token issuing"));
    assert_eq!(auth.tags, vec!["security".to_string()]);
    let edges = repos.edges.find_all().await.unwrap();
    assert_eq!(edges[0].id, Some(1));
    assert_eq!(edges[0].metadata.as_deref(), Some(OWNER_METADATA));

    repos
        .edges
        .save(Edge::new("auth", "core", EdgeType::DependsOn))
        .await
        .unwrap();
    let dumped = repos.snapshot().await.unwrap();
    assert_eq!(dumped.edges.len(), 2);
    assert_eq!(dumped.versions[0].progress, 30);
    assert_eq!(dumped.features[0].step_count, 2);
}

#[test]
fn missing_snapshot_is_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(Repositories::open(Some(&tmp.path().join("absent.json"))).is_err());
    assert!(Repositories::open(None).is_ok());
}

#[test]
fn default_config_file_loads_back() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("config.toml");
    ConfigManager::create_default_config(&path).unwrap();

    let manager = ConfigManager::load_from(&path).unwrap();
    assert_eq!(manager.config_path(), Some(path.as_path()));
    assert!(!manager.config().versions.default_tags.is_empty());
}

#[test]
fn load_from_missing_file_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let result = ConfigManager::load_from(&tmp.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}
