//! Cascade Graph - Main Server
//!
//! Semantic graph engine with cascading activation and a live event stream.

use anyhow::Result;
use cascade_graph::graph::{seed_sample_graph, GraphEngine, ScenarioKind};
use cascade_graph::mirror::MemoryMirror;
use cascade_graph::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cascade-graph")]
#[command(about = "Semantic graph engine with cascading activation")]
struct Cli {
    /// Path to the YAML config file (defaults to ./config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP / WebSocket server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Start with an empty graph
        #[arg(long)]
        empty: bool,
    },

    /// Run one activation wave on the sample graph and print the report
    Demo {
        /// Node that receives the initial activation
        #[arg(short, long, default_value = "event-1")]
        trigger: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cascade_graph=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, empty } => {
            if let Some(port) = port {
                config.server_port = port;
            }
            if empty {
                config.seed_sample = false;
            }
            cascade_graph::start_server(config).await
        }
        Commands::Demo { trigger } => run_demo(config, &trigger).await,
    }
}

async fn run_demo(config: Config, trigger: &str) -> Result<()> {
    let engine = GraphEngine::new(
        Arc::new(MemoryMirror::new()),
        Arc::new(config.delay_model()),
    );
    seed_sample_graph(&engine).await;

    tracing::info!("Running activation wave from {}", trigger);
    let report = engine
        .run_cascade(trigger, ScenarioKind::ActivationWave)
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", serde_json::to_string_pretty(&engine.stats().await)?);
    Ok(())
}
