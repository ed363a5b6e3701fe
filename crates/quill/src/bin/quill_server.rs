//! Quill REST Server
//!
//! HTTP REST API server over the catalog query engine. Loads the catalog
//! once at startup and shares one engine across all requests.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use quill::catalog::InMemoryCatalog;
use quill::config::Config;
use quill::embeddings::CachedEmbedder;
use quill::engine::QueryEngine;
use quill::ports::{CompletionPort, OllamaClient};
use quill::server::start_server;

#[derive(Parser)]
#[command(name = "quill_server")]
#[command(about = "Quill REST API Server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
  /// Server bind address
  #[arg(long, default_value = "127.0.0.1:3000")]
  bind: SocketAddr,

  /// Config file (defaults to .quill.json, quill.json, ~/.quill/config.json)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Ollama base URL
  #[arg(long, env = "QUILL_OLLAMA_URL")]
  ollama_url: Option<String>,

  /// Catalog JSON file
  #[arg(long, env = "QUILL_CATALOG")]
  catalog: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

fn load_config(args: &Args) -> Result<Config> {
  let mut config = match &args.config {
    Some(path) => Config::load_from_file(path)?,
    None => Config::load()?,
  };
  if let Some(url) = &args.ollama_url {
    config.ollama_base_url = url.clone();
  }
  if let Some(catalog) = &args.catalog {
    config.catalog_path = catalog.clone();
  }
  config.validate()?;
  Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  bentley::init_tracing(args.verbose);

  bentley::announce(&format!("Quill REST Server v{}", env!("CARGO_PKG_VERSION")));
  let config = load_config(&args)?;

  let path = config.catalog_path.display();
  let mut catalog = InMemoryCatalog::from_path(&config.catalog_path)
    .map_err(|e| anyhow!("Failed to load catalog from {path}: {e}"))?;

  let ollama = Arc::new(OllamaClient::new(&config));
  if ollama.health_check().await {
    let embedder = CachedEmbedder::from_config(ollama.clone(), &config);
    let filled = catalog.embed_missing(&embedder).await;
    if filled > 0 {
      bentley::info!("embedded {filled} products at startup");
    }
  } else {
    bentley::warn!("Ollama is not reachable at {}; serving degraded answers", ollama.base_url());
  }
  let completion: Arc<dyn CompletionPort> = ollama.clone();
  let engine = QueryEngine::build(&config, Arc::new(catalog), ollama, Some(completion))?;

  bentley::info!("Binding to address: {}", args.bind);
  start_server(args.bind, Arc::new(engine)).await?;

  Ok(())
}
