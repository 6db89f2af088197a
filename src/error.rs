//! Pipeline-level errors.
//!
//! Wraps the core error types with the context a caller needs to act on a
//! failure: which row or record id, which collection, which backend.

use thiserror::Error;

use catalog_vectors_core::error::{DatasetError, ProviderError, StoreError};
use catalog_vectors_core::models::BackendKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Ingestion was attempted before the embedding stage ran.
    #[error("table has no embedding column; run the embedding stage (embed_column) before ingesting")]
    MissingEmbedding,

    #[error("column '{0}' not found in table")]
    UnknownColumn(String),

    #[error("embedding row {row} failed: {source}")]
    Embedding {
        row: usize,
        #[source]
        source: ProviderError,
    },

    #[error("failed to encode query: {0}")]
    Query(#[source] ProviderError),

    #[error("upsert of record {id} into '{collection}' ({backend}) failed: {source}")]
    Upsert {
        id: u64,
        collection: String,
        backend: BackendKind,
        #[source]
        source: StoreError,
    },

    #[error("search in '{collection}' ({backend}) failed: {source}")]
    Search {
        collection: String,
        backend: BackendKind,
        #[source]
        source: StoreError,
    },

    #[error("clearing '{collection}' ({backend}) failed: {source}")]
    Clear {
        collection: String,
        backend: BackendKind,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
