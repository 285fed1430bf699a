//! Cache header policy preview server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request          ┌──────────────────────────────────────────────┐
//!     ────────────────────────┼─▶ stub handler                               │
//!                             │        │                                     │
//!                             │        ▼                                     │
//!     Client Response         │  cache_control middleware                    │
//!     ◀───────────────────────┼──  → CacheControlListener                    │
//!                             │       → RuleSet (first match)                │
//!                             │       → HeaderComposer (merge / overwrite)   │
//!                             │                                              │
//!                             │  config (TOML) ── watcher ──▶ listener swap  │
//!                             └──────────────────────────────────────────────┘
//! ```
//!
//! `serve` runs the preview server, `check` validates a rule file and prints the
//! compiled rules.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::net::TcpListener;

use cache_header_policy::config::watcher::ConfigWatcher;
use cache_header_policy::config::{load_config, AppConfig};
use cache_header_policy::observability::{logging, metrics};
use cache_header_policy::{CacheControlListener, CacheControlState, HttpServer, MatcherRegistry};

#[derive(Parser)]
#[command(name = "cache-header-policy")]
#[command(about = "Rule-driven HTTP cache header policy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a stub application with the cache header middleware
    Serve {
        /// Reload rules when the config file changes
        #[arg(long)]
        watch: bool,
    },
    /// Validate the configuration and print the compiled rules
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    match cli.command.unwrap_or(Commands::Serve { watch: false }) {
        Commands::Check => check(&config),
        Commands::Serve { watch } => serve(config, cli.config, watch).await,
    }
}

fn check(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = CacheControlListener::from_config(&config.cache_control, &MatcherRegistry::default())?;

    let rules: Vec<_> = listener
        .rules()
        .iter()
        .enumerate()
        .map(|(index, rule)| {
            json!({
                "index": index,
                "name": rule.name(),
                "headers": rule.headers(),
            })
        })
        .collect();

    let summary = json!({
        "skip": config.cache_control.skip,
        "debug_header": config.cache_control.debug_header,
        "rules": rules,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn serve(
    config: AppConfig,
    config_path: Option<PathBuf>,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing(&config.observability);
    tracing::info!("cache-header-policy v{} starting", env!("CARGO_PKG_VERSION"));

    let registry = MatcherRegistry::default();
    let listener = CacheControlListener::from_config(&config.cache_control, &registry)?;
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rules = listener.rules().len(),
        skip = config.cache_control.skip,
        "Configuration loaded"
    );
    let state = CacheControlState::new(listener);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    // The watcher handle must outlive the server.
    let _watcher = match (watch, &config_path) {
        (true, Some(path)) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let state = state.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    match CacheControlListener::from_config(&new_config.cache_control, &registry) {
                        Ok(listener) => {
                            tracing::info!(rules = listener.rules().len(), "Cache rules reloaded");
                            state.replace(listener);
                        }
                        Err(e) => tracing::error!(error = %e, "Reloaded rules rejected"),
                    }
                }
            });
            Some(handle)
        }
        (true, None) => {
            tracing::warn!("--watch needs --config; hot reload disabled");
            None
        }
        _ => None,
    };

    let tcp = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %tcp.local_addr()?, "Listening for connections");

    HttpServer::new(&config, state).run(tcp).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
