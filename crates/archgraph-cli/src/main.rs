mod output;

use anyhow::{bail, Context, Result};
use archgraph_api::{AppState, Server};
use archgraph_core::{
    ApiKey, ApiKeyScope, ArchGraphConfig, ConfigManager, LoggingConfig, Repositories,
};
use archgraph_graph::{
    ensure_node_exists, GetArchitecture, GetDependencyCycles, GetDependencyTree, GetDependents,
    GetImplementationOrder, GetNeighbourhood, GetNextImplementable, GetShortestPath,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use output::{print_output, OutputFormat};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

#[derive(Parser)]
#[command(name = "archgraph")]
#[command(
    about = "ArchGraph CLI - architecture graph queries, export and API server",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./.archgraph.toml, then ~/.archgraph/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file seeding the in-memory store
    #[arg(short, long, global = true, env = "ARCHGRAPH_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shortest path between two nodes, ignoring edge direction
    Path {
        from: String,
        to: String,
    },

    /// Dependency tree of a node
    Deps {
        id: String,

        /// How many levels of dependencies to expand
        #[arg(short, long, default_value_t = 1)]
        depth: usize,
    },

    /// Nodes that depend on a node
    Dependents {
        id: String,
    },

    /// Nodes and edges within N hops of a node
    Neighbourhood {
        id: String,

        #[arg(long, default_value_t = 1)]
        hops: usize,
    },

    /// Implementation order of components, or the nodes a cycle blocks
    Order,

    /// Dependency cycles among components
    Cycles,

    /// Components ready to implement for a version tag
    Next {
        version: String,
    },

    /// Export the enriched architecture graph
    Architecture {
        /// Write the export to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Serve the REST API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Issue an API key and store it in the snapshot
    Keygen {
        name: String,

        /// Granted scopes (read, write, admin), comma separated
        #[arg(long = "scope", value_delimiter = ',', default_value = "write")]
        scopes: Vec<ApiKeyScope>,

        #[arg(long)]
        expires_in_days: Option<i64>,
    },

    /// Write a default config file
    InitConfig {
        #[arg(default_value = ".archgraph.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.verbose, std::io::stderr)?;
    init_tracing(&config.logging, cli.verbose)?;

    match execute_command(&cli, config).await {
        Ok(Some(output)) => {
            print_output(cli.output, &output)?;
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Loads the configuration under a scoped bootstrap subscriber, since the
/// real one depends on the logging section being loaded.
fn load_config<W>(path: Option<&Path>, verbose: bool, writer: W) -> Result<ArchGraphConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();

    tracing::subscriber::with_default(bootstrap, || -> Result<ArchGraphConfig> {
        let manager = match path {
            Some(path) => ConfigManager::load_from(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?,
            None => ConfigManager::load().context("Failed to load configuration")?,
        };
        Ok(manager.config().clone())
    })
}

/// `RUST_LOG` wins when it holds a full directive; otherwise `--verbose`
/// or the configured level applies.
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},tower_http={level}", level = level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => registry.with(fmt.json()).try_init(),
        "compact" => registry.with(fmt.compact()).try_init(),
        _ => registry.with(fmt).try_init(),
    }
    .context("Failed to initialise logging")
}

fn snapshot_path(cli: &Cli, config: &ArchGraphConfig) -> Option<PathBuf> {
    cli.snapshot
        .clone()
        .or_else(|| config.data.snapshot_path.clone())
}

fn open_repositories(path: Option<&Path>) -> Result<Repositories> {
    Repositories::open(path).with_context(|| match path {
        Some(path) => format!("Failed to open snapshot {}", path.display()),
        None => "Failed to create in-memory store".to_string(),
    })
}

async fn execute_command(cli: &Cli, config: ArchGraphConfig) -> Result<Option<Value>> {
    let snapshot = snapshot_path(cli, &config);
    debug!(snapshot = ?snapshot, "Resolved snapshot path");

    match &cli.command {
        Commands::InitConfig { path } => {
            ConfigManager::create_default_config(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(Some(json!({ "written": path.display().to_string() })))
        }
        Commands::Keygen {
            name,
            scopes,
            expires_in_days,
        } => keygen(snapshot.as_deref(), name, scopes, *expires_in_days).await.map(Some),
        Commands::Serve { host, port } => {
            serve(snapshot.as_deref(), config, host.clone(), *port).await?;
            Ok(None)
        }
        query => {
            let repos = open_repositories(snapshot.as_deref())?;
            run_query(query, &repos).await.map(Some)
        }
    }
}

async fn run_query(command: &Commands, repos: &Repositories) -> Result<Value> {
    let nodes = repos.nodes.clone();
    let edges = repos.edges.clone();

    let value = match command {
        Commands::Path { from, to } => {
            let path = GetShortestPath::new(nodes, edges).execute(from, to).await?;
            if path.is_empty() {
                info!(from = %from, to = %to, "No path found");
            }
            serde_json::to_value(path)?
        }
        Commands::Deps { id, depth } => {
            ensure_node_exists(nodes.as_ref(), id).await?;
            serde_json::to_value(GetDependencyTree::new(nodes, edges).execute(id, *depth).await?)?
        }
        Commands::Dependents { id } => {
            ensure_node_exists(nodes.as_ref(), id).await?;
            serde_json::to_value(GetDependents::new(nodes, edges).execute(id).await?)?
        }
        Commands::Neighbourhood { id, hops } => {
            ensure_node_exists(nodes.as_ref(), id).await?;
            serde_json::to_value(GetNeighbourhood::new(nodes, edges).execute(id, *hops).await?)?
        }
        Commands::Order => {
            serde_json::to_value(GetImplementationOrder::new(nodes, edges).execute().await?)?
        }
        Commands::Cycles => {
            serde_json::to_value(GetDependencyCycles::new(nodes, edges).execute().await?)?
        }
        Commands::Next { version } => {
            let next = GetNextImplementable::new(nodes, edges, repos.versions.clone())
                .execute(version)
                .await?;
            serde_json::to_value(next)?
        }
        Commands::Architecture { out } => {
            let architecture = GetArchitecture::new(
                nodes,
                edges,
                repos.versions.clone(),
                repos.features.clone(),
            )
            .execute()
            .await?;

            match out {
                Some(path) => {
                    let body = serde_json::to_string_pretty(&architecture)?;
                    std::fs::write(path, body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    json!({
                        "written": path.display().to_string(),
                        "stats": architecture.stats,
                    })
                }
                None => serde_json::to_value(architecture)?,
            }
        }
        Commands::Serve { .. } | Commands::Keygen { .. } | Commands::InitConfig { .. } => {
            bail!("not a query command")
        }
    };
    Ok(value)
}

async fn serve(
    snapshot: Option<&Path>,
    mut config: ArchGraphConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let repos = open_repositories(snapshot)?;
    let state = AppState::new(repos, config);
    Server::new(addr, state)
        .run()
        .await
        .context("API server failed")
}

async fn keygen(
    snapshot: Option<&Path>,
    name: &str,
    scopes: &[ApiKeyScope],
    expires_in_days: Option<i64>,
) -> Result<Value> {
    let Some(path) = snapshot else {
        bail!("keygen needs --snapshot (or data.snapshot_path) to store the key");
    };
    if scopes.is_empty() {
        bail!("at least one scope is required");
    }

    let repos = if path.exists() {
        open_repositories(Some(path))?
    } else {
        Repositories::in_memory()
    };
    if repos.api_keys.find_by_name(name).await?.is_some() {
        bail!("an API key named '{}' already exists", name);
    }

    let expires_in = expires_in_days.map(chrono::Duration::days);
    let (key, plaintext) = ApiKey::generate(name, scopes.to_vec(), expires_in);
    let summary = json!({
        "name": key.name,
        "key": plaintext,
        "prefix": key.prefix,
        "scopes": key.scopes,
        "expires_at": key.expires_at,
    });

    repos.api_keys.save(key).await?;
    repos
        .snapshot()
        .await?
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(name, snapshot = %path.display(), "Issued API key");
    eprintln!(
        "{}",
        "Store this key now; it cannot be shown again.".yellow().bold()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::{Arc, Mutex};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_query_flags() {
        let cli = Cli::try_parse_from([
            "archgraph",
            "--output",
            "table",
            "deps",
            "api",
            "--depth",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Table);
        assert!(matches!(cli.command, Commands::Deps { ref id, depth: 3 } if id == "api"));
    }

    #[test]
    fn keygen_scopes_are_comma_separated() {
        let cli =
            Cli::try_parse_from(["archgraph", "keygen", "ci", "--scope", "read,admin"]).unwrap();
        match cli.command {
            Commands::Keygen { scopes, .. } => {
                assert_eq!(scopes, vec![ApiKeyScope::Read, ApiKeyScope::Admin])
            }
            _ => panic!("expected keygen"),
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_loading_is_logged_before_tracing_starts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        ConfigManager::create_default_config(&path).unwrap();

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let config = load_config(Some(&path), true, move || writer.clone()).unwrap();
        assert!(!config.versions.default_tags.is_empty());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Configuration loaded"), "{}", output);

        let missing = dir.path().join("absent.toml");
        assert!(load_config(Some(&missing), false, std::io::sink).is_err());
    }

    #[tokio::test]
    async fn keygen_persists_into_a_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let summary = keygen(Some(&path), "ci", &[ApiKeyScope::Write], Some(30))
            .await
            .unwrap();
        let plaintext = summary["key"].as_str().unwrap();

        let repos = Repositories::open(Some(&path)).unwrap();
        let stored = repos.api_keys.find_by_name("ci").await.unwrap().unwrap();
        assert!(stored.verify(plaintext, chrono::Utc::now()));
        assert!(stored.expires_at.is_some());

        assert!(keygen(Some(&path), "ci", &[ApiKeyScope::Write], None)
            .await
            .is_err());
        assert!(keygen(None, "other", &[ApiKeyScope::Read], None).await.is_err());
    }

    #[tokio::test]
    async fn queries_run_against_a_snapshot() {
        use archgraph_core::{Edge, EdgeType, Node, NodeType, Snapshot};

        let repos = Repositories::from_snapshot(Snapshot {
            nodes: vec![
                Node::new("api", "API", NodeType::Component),
                Node::new("db", "DB", NodeType::Store),
            ],
            edges: vec![Edge::new("api", "db", EdgeType::DependsOn)],
            ..Snapshot::default()
        });

        let order = run_query(&Commands::Order, &repos).await.unwrap();
        assert_eq!(order, json!({ "order": ["db", "api"] }));

        let missing = run_query(&Commands::Dependents { id: "ghost".into() }, &repos).await;
        assert!(missing.is_err());
    }
}
