// Podium - LLM-driven debate simulator service
// Main entry point

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use podium::config::load_config;
use podium::gemini::GeminiClient;
use podium::server::DebateServer;
use podium::store::TranscriptStore;

#[derive(Parser)]
#[command(name = "podium", about = "LLM-driven debate simulator service")]
struct Cli {
    /// Bind address override (e.g. "0.0.0.0:8787")
    #[arg(long)]
    bind: Option<String>,

    /// Transcript database path override
    #[arg(long)]
    store: Option<std::path::PathBuf>,

    /// Generation model override (e.g. "gemini-2.0-flash")
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = load_config()?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }

    let store = TranscriptStore::open(&config.store_path)?;

    let client = GeminiClient::new(config.api_key.clone())?.with_model(config.model.clone());

    let server = DebateServer::new(config, Arc::new(client), store)?;
    server.serve().await?;

    Ok(())
}
