//! Embedding and ingestion pipeline.
//!
//! Flow: prepared table → [`embed_column`] → (optional [`clear_collection`])
//! → [`ingest`]. Record ids are row positions starting at 1, so re-ingesting
//! the same file replaces points instead of duplicating them. Reordering or
//! filtering the source rows between runs changes which record owns an id.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use catalog_vectors_core::embedding::EmbeddingProvider;
use catalog_vectors_core::models::{Ack, CellValue, Embedding, IndexedPoint};
use catalog_vectors_core::prepare::PreparedTable;
use catalog_vectors_core::store::VectorStore;

use crate::config::Config;
use crate::dataset;
use crate::error::PipelineError;
use crate::retry::RetryPolicy;

/// What [`ingest`] does when a row cannot be upserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next row.
    #[default]
    Continue,
    /// Stop at the first failure.
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub id: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub upserted: usize,
    pub failures: Vec<RowFailure>,
}

/// Encodes every non-null cell of `column` and attaches the embeddings.
///
/// Rows whose cell is null get no embedding. Provider errors are retried
/// per `retry`; the first one that survives aborts the pass.
pub fn embed_column(
    table: PreparedTable,
    column: &str,
    provider: &dyn EmbeddingProvider,
    retry: &RetryPolicy,
) -> Result<PreparedTable, PipelineError> {
    if !table.has_column(column) {
        return Err(PipelineError::UnknownColumn(column.to_string()));
    }

    let mut embeddings: Vec<Option<Embedding>> = Vec::with_capacity(table.len());
    for (row, record) in table.records().enumerate() {
        let text = match record.get(column) {
            None | Some(CellValue::Null) => {
                debug!(row, column, "null text, no embedding");
                embeddings.push(None);
                continue;
            }
            Some(value) => value.to_string(),
        };
        let vector = retry
            .run("encode", || provider.encode(&text))
            .map_err(|source| PipelineError::Embedding { row, source })?;
        embeddings.push(Some(vector));
    }

    info!(
        rows = embeddings.len(),
        embedded = embeddings.iter().filter(|e| e.is_some()).count(),
        model = provider.model_name(),
        "embedded column"
    );
    Ok(table.with_embeddings(embeddings))
}

/// Upserts every row of `table` into `collection`, in row order.
pub fn ingest(
    table: &PreparedTable,
    store: &dyn VectorStore,
    collection: &str,
    policy: FailurePolicy,
    retry: &RetryPolicy,
) -> Result<IngestReport, PipelineError> {
    let embeddings = table.embeddings().ok_or(PipelineError::MissingEmbedding)?;
    let mut report = IngestReport::default();

    for (row, record) in table.records().enumerate() {
        let id = row as u64 + 1;
        let vector = embeddings.get(row).cloned().flatten().unwrap_or_default();
        let point = IndexedPoint::new(id, vector, record.clone());

        match retry.run("upsert", || store.upsert(&point, collection)) {
            Ok(_) => {
                debug!(id, collection, "ingested row");
                report.upserted += 1;
            }
            Err(source) => match policy {
                FailurePolicy::Abort => {
                    return Err(PipelineError::Upsert {
                        id,
                        collection: collection.to_string(),
                        backend: store.backend(),
                        source,
                    });
                }
                FailurePolicy::Continue => {
                    warn!(id, collection, error = %source, "skipping row");
                    report.failures.push(RowFailure {
                        id,
                        message: source.to_string(),
                    });
                }
            },
        }
    }

    info!(
        collection,
        backend = %store.backend(),
        upserted = report.upserted,
        failed = report.failures.len(),
        "ingestion finished"
    );
    Ok(report)
}

/// Drops `collection`. A missing collection is [`Ack::NoOp`].
pub fn clear_collection(
    store: &dyn VectorStore,
    collection: &str,
    retry: &RetryPolicy,
) -> Result<Ack, PipelineError> {
    retry
        .run("clear", || store.clear(collection))
        .map_err(|source| PipelineError::Clear {
            collection: collection.to_string(),
            backend: store.backend(),
            source,
        })
}

pub fn run_ingest(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    input: &Path,
    collection: &str,
    clear: bool,
    output: Option<&Path>,
) -> Result<()> {
    let retry = RetryPolicy::from_config(&config.retry);
    let (table, stats) = dataset::load_prepared(config, input)?;
    let table = embed_column(table, &config.dataset.text_column, provider, &retry)
        .context("Embedding stage failed")?;
    if let Some(output) = output {
        dataset::save_csv(&table, output)?;
    }

    if clear {
        let ack = clear_collection(store, collection, &retry)?;
        println!(
            "cleared {}: {}",
            collection,
            if ack == Ack::Applied { "dropped" } else { "did not exist" }
        );
    }

    let report = ingest(&table, store, collection, config.ingest.on_error, &retry)?;

    println!("ingest {} into {} ({})", input.display(), collection, store.backend());
    println!("  rows: {}", stats.rows);
    println!("  upserted: {}", report.upserted);
    println!("  failed: {}", report.failures.len());
    for failure in &report.failures {
        println!("    id {}: {}", failure.id, failure.message);
    }
    println!("ok");
    Ok(())
}

pub fn run_clear(config: &Config, store: &dyn VectorStore, collection: &str) -> Result<()> {
    let retry = RetryPolicy::from_config(&config.retry);
    match clear_collection(store, collection, &retry)? {
        Ack::Applied => println!("cleared {}", collection),
        Ack::NoOp => println!("{} did not exist, nothing to clear", collection),
    }
    Ok(())
}
