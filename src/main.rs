//! # Chunk Admin CLI (`chunk-admin`)
//!
//! Serves the HTTP API used by the admin UI and exposes the same
//! operations on the command line.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chunk-admin serve` | Start the HTTP API |
//! | `chunk-admin query` | Query chunks by id, text, or metadata |
//! | `chunk-admin get <id>` | Print one chunk |
//! | `chunk-admin update <id>` | Update content and/or metadata |
//! | `chunk-admin delete <id>` | Delete one chunk |
//! | `chunk-admin stats` | Print index statistics |
//! | `chunk-admin process` | Rewrite query lines with a prompt |
//!
//! ## Examples
//!
//! ```bash
//! export PINECONE_API_KEY=... PINECONE_INDEX=docs VOYAGE_API_KEY=...
//!
//! chunk-admin query --text "password reset" --module auth
//! chunk-admin query --module Core --metadata-filter --page 2
//! chunk-admin update 3f9c-0 --metadata '{"tags": ["faq"]}'
//! chunk-admin process --prompt "Shorten each query" --file queries.txt
//! chunk-admin serve
//! chunk-admin serve --in-memory --seed chunks.json
//! ```

use chunk_admin::config::{self, process_env, Config};
use chunk_admin::models::QueryChunksRequest;
use chunk_admin::providers::Providers;
use chunk_admin::store::memory::{self, InMemoryVectorStore};
use chunk_admin::{mutation, processor, query, server, stats};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./config/chunk-admin.toml";

/// Chunk Admin: inspect, edit and delete chunks in a hosted vector index.
///
/// Credentials come from the environment (`PINECONE_API_KEY`,
/// `VOYAGE_API_KEY`, `OPENAI_API_KEY`); everything else may be set in a
/// TOML file. See `config/chunk-admin.example.toml`.
#[derive(Parser)]
#[command(name = "chunk-admin", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/chunk-admin.toml` when that file exists;
    /// otherwise built-in defaults plus environment variables are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind` (or `PORT`) and serves the `/api` routes.
    Serve {
        /// Keep chunks in process memory instead of the hosted index.
        #[arg(long)]
        in_memory: bool,
        /// JSON array of chunk records to load into the in-memory store.
        #[arg(long, requires = "in_memory")]
        seed: Option<PathBuf>,
    },

    /// Query chunks.
    ///
    /// `--id` wins over everything else; otherwise `--text` runs a semantic
    /// query, and module/name/path narrow the results with fuzzy matching.
    Query {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        module: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        path: Option<String>,
        /// Free-text semantic query.
        #[arg(long)]
        text: Option<String>,
        /// Also send module/name/path to the index as an exact-match filter.
        #[arg(long)]
        metadata_filter: bool,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Print one chunk by id.
    Get { id: String },

    /// Update a chunk's content and/or metadata.
    ///
    /// Changing the content regenerates its embedding; a metadata-only
    /// update keeps the stored vector.
    Update {
        id: String,
        /// New content.
        #[arg(long)]
        content: Option<String>,
        /// JSON object merged over the stored metadata (shallow).
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Delete a chunk by id.
    Delete { id: String },

    /// Print index statistics.
    Stats,

    /// Rewrite every line of a query with a language model.
    Process {
        /// Instruction applied to each line.
        #[arg(long)]
        prompt: String,
        /// Multi-line query text.
        query: Option<String>,
        /// Read the query from a file instead.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => config::load_config(path, process_env),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            config::load_config(Path::new(DEFAULT_CONFIG_PATH), process_env)
        }
        None => config::env_config(process_env),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref())?;

    let providers = Providers::new(Arc::new(cfg.clone()));

    match cli.command {
        Commands::Serve { in_memory, seed } => {
            if in_memory {
                let records = match seed {
                    Some(path) => memory::load_seed(&path)?,
                    None => Vec::new(),
                };
                tracing::info!(records = records.len(), "starting with in-memory store");
                let store = InMemoryVectorStore::with_records(records);
                server::run_server_in_memory(&cfg, Arc::new(store)).await?;
            } else {
                server::run_server(&cfg).await?;
            }
        }
        Commands::Query {
            id,
            module,
            name,
            path,
            text,
            metadata_filter,
            top_k,
            page,
            page_size,
        } => {
            let request = QueryChunksRequest {
                id,
                module,
                name,
                path,
                query_text: text,
                prompt: None,
                metadata_filter,
                top_k,
                page,
                page_size,
            };
            query::run_query(&providers, &request).await?;
        }
        Commands::Get { id } => {
            mutation::run_get(&providers, &id).await?;
        }
        Commands::Update {
            id,
            content,
            metadata,
        } => {
            mutation::run_update(&providers, &id, content, metadata).await?;
        }
        Commands::Delete { id } => {
            mutation::run_delete(&providers, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&providers).await?;
        }
        Commands::Process {
            prompt,
            query,
            file,
        } => {
            processor::run_process(&providers, &prompt, query, file.as_deref()).await?;
        }
    }

    Ok(())
}
