//! Cascade Graph
//!
//! A semantic graph engine with:
//! - Activation levels on every node, spread to neighbours with per-hop decay
//! - Simulated per-category latency on every operation
//! - Symmetric entanglement links between similar nodes
//! - Live event stream over WebSocket, HTTP API via axum
//! - Best-effort mirroring to sled

pub mod api;
pub mod events;
pub mod graph;
pub mod mirror;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{Context, Result};
use graph::{DelayModel, DelayProvider, GraphEngine};
use mirror::{GraphMirror, MemoryMirror, SledMirror};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub mirror: MirrorYamlConfig,
    pub delays: DelaysYamlConfig,
    pub graph: GraphYamlConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3031,
        }
    }
}

/// Durable mirror section. No path means an in-memory mirror.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MirrorYamlConfig {
    pub path: Option<PathBuf>,
}

/// Simulated latency section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DelaysYamlConfig {
    /// Multiplies every sampled delay; 0 disables pacing
    pub scale: f64,
    pub seed: Option<u64>,
}

impl Default for DelaysYamlConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphYamlConfig {
    /// Load the sample graph at startup
    pub seed_sample: bool,
}

impl Default for GraphYamlConfig {
    fn default() -> Self {
        Self { seed_sample: true }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub server_port: u16,
    pub mirror_path: Option<PathBuf>,
    pub delay_scale: f64,
    pub delay_seed: Option<u64>,
    pub seed_sample: bool,
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Build Config with env var overrides
        Ok(Self {
            host: std::env::var("CASCADE_HOST").unwrap_or(yaml.server.host),
            server_port: env_parsed("CASCADE_PORT").unwrap_or(yaml.server.port),
            mirror_path: std::env::var("CASCADE_MIRROR_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .or(yaml.mirror.path),
            delay_scale: env_parsed("CASCADE_DELAY_SCALE").unwrap_or(yaml.delays.scale),
            delay_seed: env_parsed("CASCADE_DELAY_SEED").or(yaml.delays.seed),
            seed_sample: env_parsed("CASCADE_SEED_SAMPLE").unwrap_or(yaml.graph.seed_sample),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    pub fn delay_model(&self) -> DelayModel {
        let model = match self.delay_seed {
            Some(seed) => DelayModel::seeded(seed),
            None => DelayModel::new(),
        };
        model.with_scale(self.delay_scale)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GraphEngine>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Open the mirror, build the engine and optionally load the sample graph
    pub async fn new(config: Config) -> Result<Self> {
        let mirror: Arc<dyn GraphMirror> = match &config.mirror_path {
            Some(path) => Arc::new(
                SledMirror::open(path)
                    .with_context(|| format!("Failed to open mirror at {}", path.display()))?,
            ),
            None => Arc::new(MemoryMirror::new()),
        };
        let delays: Arc<dyn DelayProvider> = Arc::new(config.delay_model());
        let engine = Arc::new(GraphEngine::new(mirror, delays));

        if config.seed_sample {
            graph::seed_sample_graph(&engine).await;
        }

        Ok(Self {
            engine,
            config: Arc::new(config),
        })
    }
}

/// Bind the configured address and serve the API until the process exits
pub async fn start_server(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.server_port);
    let state = AppState::new(config).await?;

    let router = api::create_router(Arc::new(api::ServerState {
        engine: state.engine.clone(),
    }));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Cascade graph server listening on http://{}", addr);
    tracing::info!("WebSocket events at ws://{}/ws/events", addr);

    axum::serve(listener, router).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    const ENV_KEYS: [&str; 6] = [
        "CASCADE_HOST",
        "CASCADE_PORT",
        "CASCADE_MIRROR_PATH",
        "CASCADE_DELAY_SCALE",
        "CASCADE_DELAY_SEED",
        "CASCADE_SEED_SAMPLE",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
server:
  host: 127.0.0.1
  port: 9090
mirror:
  path: /var/lib/cascade
delays:
  scale: 0.25
  seed: 42
graph:
  seed_sample: false
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.mirror.path, Some(PathBuf::from("/var/lib/cascade")));
        assert_eq!(config.delays.scale, 0.25);
        assert_eq!(config.delays.seed, Some(42));
        assert!(!config.graph.seed_sample);
    }

    #[test]
    fn test_yaml_partial_sections_use_defaults() {
        let yaml = r#"
server:
  port: 4000
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.mirror.path.is_none());
        assert_eq!(config.delays.scale, 1.0);
        assert!(config.graph.seed_sample);
    }

    /// Env var manipulation lives in a single test so parallel tests never race on it
    #[test]
    fn test_config_priority_env_over_yaml_over_default() {
        let yaml = r#"
server:
  port: 9999
delays:
  scale: 0.5
graph:
  seed_sample: false
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        // --- Phase 1: YAML over defaults ---
        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.server_port, 9999);
        assert_eq!(config.delay_scale, 0.5);
        assert!(!config.seed_sample);
        assert_eq!(config.host, "0.0.0.0");

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("CASCADE_PORT", "7777");
        std::env::set_var("CASCADE_DELAY_SEED", "9");
        std::env::set_var("CASCADE_SEED_SAMPLE", "true");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.server_port, 7777);
        assert_eq!(config.delay_seed, Some(9));
        assert!(config.seed_sample);
        // YAML value still used where no env override
        assert_eq!(config.delay_scale, 0.5);

        // Unparsable env values fall back to YAML
        std::env::set_var("CASCADE_PORT", "not-a-port");
        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.server_port, 9999);

        clear_env();

        // --- Phase 3: No YAML file → defaults ---
        let nonexistent = dir.path().join("missing.yaml");
        let config = Config::from_yaml_and_env(Some(&nonexistent)).unwrap();
        assert_eq!(config.server_port, 3031);
        assert!(config.mirror_path.is_none());
        assert!(config.seed_sample);
    }

    #[test]
    fn test_invalid_yaml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("broken.yaml");
        std::fs::write(&file_path, "server: [unclosed").unwrap();

        let yaml = Config::load_yaml(Some(&file_path));
        assert_eq!(yaml.server.port, 3031);
    }

    #[tokio::test]
    async fn test_app_state_seeds_sample_graph() {
        let config = Config {
            host: "127.0.0.1".into(),
            server_port: 0,
            mirror_path: None,
            delay_scale: 0.0,
            delay_seed: Some(1),
            seed_sample: true,
        };
        let state = AppState::new(config).await.unwrap();
        assert_eq!(state.engine.stats().await.node_count, 6);
    }

    #[tokio::test]
    async fn test_app_state_with_sled_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            host: "127.0.0.1".into(),
            server_port: 0,
            mirror_path: Some(dir.path().join("mirror")),
            delay_scale: 0.0,
            delay_seed: None,
            seed_sample: false,
        };
        let state = AppState::new(config).await.unwrap();
        assert_eq!(state.engine.stats().await.node_count, 0);
    }
}
