//! Lore CLI
//!
//! Command-line interface for the project knowledge store.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lore::error::LoreError;
use lore::intelligence::{ContextGenerator, JsonFileRecall, RecallSource, StoreRecall};
use lore::mcp::{KnowledgeHandler, ToolCall, ToolDispatcher};
use lore::storage::context_queries::list_context;
use lore::storage::instruction_queries::list_active_instructions;
use lore::storage::queries::{get_stats, list_all_knowledge};
use lore::storage::Storage;
use lore::sync::{sync_context, FileTarget, Markers};
use lore::types::*;

#[derive(Parser)]
#[command(name = "lore")]
#[command(about = "Project knowledge store CLI")]
#[command(version)]
struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, env = "LORE_DB_PATH", global = true)]
    db_path: Option<String>,

    /// Storage mode (local or cloud-safe)
    #[arg(long, env = "LORE_STORAGE_MODE", default_value = "local", global = true)]
    storage_mode: StorageMode,

    /// Identifier of the bound project
    #[arg(long, env = "LORE_PROJECT_ID", global = true)]
    project_id: Option<String>,

    /// Display name of the bound project
    #[arg(long, env = "LORE_PROJECT_NAME", global = true)]
    project_name: Option<String>,

    /// Credential for the bound project
    #[arg(long, env = "LORE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a knowledge entry
    Add {
        /// Entry title
        title: String,
        /// Entry content
        content: String,
        /// Category, e.g. technical, business, preferences
        #[arg(short, long)]
        category: String,
        /// Tags (comma-separated)
        #[arg(short = 'T', long)]
        tags: Option<String>,
        /// Importance (1-5)
        #[arg(short, long, default_value_t = DEFAULT_RATING)]
        importance: i64,
    },
    /// Search knowledge by substring
    Search {
        /// Search query
        query: String,
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List all knowledge, most important first
    List,
    /// Set the instruction for a section
    Instruct {
        /// Section name
        section: String,
        /// Instruction text
        content: String,
        /// Priority (1-5)
        #[arg(short, long, default_value_t = DEFAULT_RATING)]
        priority: i64,
    },
    /// Show active instruction sections
    Instructions,
    /// Set a context value
    ContextSet {
        key: String,
        value: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Show context entries as JSON
    Context,
    /// Show display notes
    Notes,
    /// Show the project overview
    Overview,
    /// Suggest improvements for a conversation summary
    Suggest {
        /// Conversation summary
        summary: String,
        /// Focus areas (comma-separated)
        #[arg(short, long)]
        focus: Option<String>,
    },
    /// Show statistics
    Stats,
    /// Show binding and storage status
    Status,
    /// Generate the memory block and splice it into a document
    SyncContext {
        /// Document to update
        #[arg(short, long)]
        output: PathBuf,
        /// Recall snapshot to read instead of the local store
        #[arg(long)]
        recall_file: Option<PathBuf>,
        /// Opening line of the block
        #[arg(long)]
        prefix: Option<String>,
        /// Print the result without writing
        #[arg(long)]
        dry_run: bool,
    },
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let db_path = cli.db_path.unwrap_or_else(default_db_path);
    let db_path = shellexpand::tilde(&db_path).to_string();

    let storage = Storage::open(StorageConfig::new(db_path.clone(), cli.storage_mode))
        .with_context(|| format!("failed to open knowledge database at {}", db_path))?;

    if let Some(warning) = storage.storage_mode_warning() {
        tracing::warn!("{}", warning);
    }

    let binding = ProjectBinding {
        project_id: cli.project_id,
        project_name: cli.project_name,
        api_key: cli.api_key,
    };
    let handler = KnowledgeHandler::new(storage.clone(), binding);

    // Commands that mirror a tool share its rendering
    let tool = |name: &str, args: serde_json::Value| -> anyhow::Result<()> {
        let call = ToolCall::parse(name, args)?;
        println!("{}", handler.dispatch(call)?);
        Ok(())
    };

    match cli.command {
        Commands::Add {
            title,
            content,
            category,
            tags,
            importance,
        } => tool(
            "add_knowledge",
            json!({
                "title": title,
                "content": content,
                "category": category,
                "tags": split_list(tags),
                "importance": importance,
            }),
        )?,

        Commands::Search { query, category } => tool(
            "search_knowledge",
            json!({ "query": query, "category": category }),
        )?,

        Commands::List => {
            let entries = storage.with_connection(list_all_knowledge)?;
            for entry in entries {
                println!(
                    "#{} [{}] ({}/5) {} - {}",
                    entry.id,
                    entry.category,
                    entry.importance,
                    entry.title,
                    truncate_chars(&entry.content, 60)
                );
            }
        }

        Commands::Instruct {
            section,
            content,
            priority,
        } => tool(
            "update_instructions",
            json!({ "section": section, "content": content, "priority": priority }),
        )?,

        Commands::Instructions => {
            let sections = storage.with_connection(list_active_instructions)?;
            for section in sections {
                println!("[{}] (priority {})", section.section, section.priority);
                println!("{}\n", section.content);
            }
        }

        Commands::ContextSet {
            key,
            value,
            description,
        } => tool(
            "update_context",
            json!({ "key": key, "value": value, "description": description }),
        )?,

        Commands::Context => {
            let entries = storage.with_connection(list_context)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }

        Commands::Notes => tool("list_display_notes", json!({}))?,

        Commands::Overview => tool("overview", json!({}))?,

        Commands::Suggest { summary, focus } => tool(
            "suggest_improvements",
            json!({ "conversation_summary": summary, "focus_areas": split_list(focus) }),
        )?,

        Commands::Stats => {
            let stats = storage.with_connection(get_stats)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Status => tool("check_context_status", json!({}))?,

        Commands::SyncContext {
            output,
            recall_file,
            prefix,
            dry_run,
        } => {
            let source: Box<dyn RecallSource> = match recall_file {
                Some(path) => Box::new(JsonFileRecall::new(path)),
                None => Box::new(StoreRecall::new(storage.clone())),
            };
            let mut generator = ContextGenerator::new(source);
            if let Some(prefix) = prefix {
                generator = generator.with_prefix(prefix);
            }
            let block = generator.generate().render();

            let target = FileTarget::new(&output);
            match sync_context(&target, &block, &Markers::default(), dry_run) {
                Ok(outcome) if dry_run => print!("{}", outcome.document),
                Ok(outcome) if outcome.written => println!(
                    "{} context block in {}",
                    if outcome.replaced { "Updated" } else { "Added" },
                    output.display()
                ),
                Ok(_) => println!("{} already up to date", output.display()),
                Err(LoreError::SpliceTarget { message, block }) => {
                    // Keep the generated block usable even when the target is not
                    println!("{}", block);
                    anyhow::bail!(message);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
