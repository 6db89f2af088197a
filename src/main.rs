//! # Catalog Vectors CLI (`cvx`)
//!
//! ## Usage
//!
//! ```bash
//! cvx --config ./config/cvx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cvx prepare <input.csv>` | Clean a dataset and report what changed |
//! | `cvx ingest <input.csv>` | Prepare, embed and upsert a dataset |
//! | `cvx search "<query>"` | Retrieve the most similar records |
//! | `cvx clear` | Drop a collection |
//! | `cvx health` | Probe the configured backend |
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `warn`).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use catalog_vectors::config::{self, Config, Secrets};
use catalog_vectors::embedding;
use catalog_vectors::{dataset, ingest, search, store};
use catalog_vectors_core::embedding::EmbeddingProvider;
use catalog_vectors_core::store::VectorStore;

/// Catalog Vectors: embed product catalogs into a vector store and
/// search them by meaning.
///
/// All commands accept a `--config` flag pointing to a TOML file. See
/// `config/cvx.example.toml` for every setting.
#[derive(Parser)]
#[command(
    name = "cvx",
    about = "Vector ingestion and retrieval for tabular product catalogs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cvx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and clean a CSV dataset without embedding it.
    ///
    /// Non-finite numbers become empty cells and the configured list
    /// column is flattened to comma-separated text.
    Prepare {
        /// Input CSV file with a header row.
        input: PathBuf,

        /// Write the cleaned table here.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Prepare, embed and upsert a CSV dataset.
    ///
    /// Record ids are row positions starting at 1, so re-running on the
    /// same file replaces points rather than duplicating them.
    Ingest {
        input: PathBuf,

        /// Target collection (defaults to `store.collection`).
        #[arg(long)]
        collection: Option<String>,

        /// Drop the collection before ingesting.
        #[arg(long)]
        clear: bool,

        /// Also write the prepared table with its embedding column.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Find the records most similar to a free-text query.
    Search {
        query: String,

        #[arg(long)]
        collection: Option<String>,

        /// Maximum number of results.
        #[arg(long, default_value_t = search::DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Drop a collection and its schema. Missing collections are fine.
    Clear {
        #[arg(long)]
        collection: Option<String>,
    },

    /// Check that the configured backend is reachable.
    ///
    /// Always exits 0; the status is printed.
    Health,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let secrets = cfg.resolve_secrets(|var| std::env::var(var).ok());

    match cli.command {
        Commands::Prepare { input, output } => {
            dataset::run_prepare(&cfg, &input, output.as_deref())?;
        }
        Commands::Ingest {
            input,
            collection,
            clear,
            output,
        } => {
            let provider = open_provider(&cfg, &secrets)?;
            let store = open_store(&cfg, &secrets)?;
            let collection = collection.unwrap_or_else(|| cfg.store.collection.clone());
            ingest::run_ingest(
                &cfg,
                provider.as_ref(),
                store.as_ref(),
                &input,
                &collection,
                clear,
                output.as_deref(),
            )?;
        }
        Commands::Search {
            query,
            collection,
            limit,
        } => {
            let provider = open_provider(&cfg, &secrets)?;
            let store = open_store(&cfg, &secrets)?;
            let collection = collection.unwrap_or_else(|| cfg.store.collection.clone());
            search::run_search(
                &cfg,
                provider.as_ref(),
                store.as_ref(),
                &query,
                &collection,
                limit,
            )?;
        }
        Commands::Clear { collection } => {
            let store = open_store(&cfg, &secrets)?;
            let collection = collection.unwrap_or_else(|| cfg.store.collection.clone());
            ingest::run_clear(&cfg, store.as_ref(), &collection)?;
        }
        Commands::Health => {
            let status = match store::connect_from_config(&cfg.store, &secrets) {
                Ok(store) => store.health_check(),
                Err(e) => catalog_vectors_core::models::HealthStatus::failed(e.to_string()),
            };
            println!(
                "{}: {}",
                cfg.store.backend,
                if status.healthy { "healthy" } else { "unhealthy" }
            );
            println!("  {}", status.message);
        }
    }

    Ok(())
}

fn open_provider(cfg: &Config, secrets: &Secrets) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    let provider = embedding::create_provider(&cfg.embedding, secrets.embedding_api_key.as_deref())
        .context("Failed to create embedding provider")?;
    if provider.dims() != cfg.store.dims {
        // Existing collections keep their own size, so this is only a hint.
        warn!(
            model = provider.model_name(),
            provider_dims = provider.dims(),
            store_dims = cfg.store.dims,
            "embedding size differs from store.dims; new collections will reject these vectors"
        );
    }
    Ok(provider)
}

fn open_store(cfg: &Config, secrets: &Secrets) -> anyhow::Result<Box<dyn VectorStore>> {
    store::connect_from_config(&cfg.store, secrets)
        .with_context(|| format!("Failed to connect to {} backend", cfg.store.backend))
}
