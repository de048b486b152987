//! Lore MCP Server
//!
//! Run with: lore-server

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lore::mcp::{KnowledgeHandler, McpServer};
use lore::storage::Storage;
use lore::types::*;

#[derive(Parser, Debug)]
#[command(name = "lore-server")]
#[command(about = "Lore MCP server for project knowledge")]
#[command(version)]
struct Args {
    /// Database path (defaults to the platform data directory)
    #[arg(long, env = "LORE_DB_PATH")]
    db_path: Option<String>,

    /// Storage mode (local or cloud-safe)
    #[arg(long, env = "LORE_STORAGE_MODE", default_value = "local")]
    storage_mode: StorageMode,

    /// Identifier of the bound project
    #[arg(long, env = "LORE_PROJECT_ID")]
    project_id: Option<String>,

    /// Display name of the bound project
    #[arg(long, env = "LORE_PROJECT_NAME")]
    project_name: Option<String>,

    /// Credential for the bound project
    #[arg(long, env = "LORE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries MCP frames
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let db_path = args.db_path.unwrap_or_else(default_db_path);
    let db_path = shellexpand::tilde(&db_path).to_string();

    let storage = Storage::open(StorageConfig::new(db_path.clone(), args.storage_mode))
        .with_context(|| format!("failed to open knowledge database at {}", db_path))?;

    if let Some(warning) = storage.storage_mode_warning() {
        tracing::warn!("{}", warning);
    }

    let binding = ProjectBinding {
        project_id: args.project_id,
        project_name: args.project_name,
        api_key: args.api_key,
    };

    tracing::info!(
        db_path = %db_path,
        storage_mode = args.storage_mode.as_str(),
        project = binding.display_name(),
        "lore MCP server starting"
    );

    let handler = KnowledgeHandler::new(storage, binding);
    McpServer::new(handler)
        .run()
        .context("MCP server loop failed")?;

    Ok(())
}
