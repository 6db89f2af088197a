//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the one contract every backend variant
//! implements in full, so the ingestion and retrieval pipelines never see
//! a backend-specific SDK shape. Variants are chosen by
//! [`BackendKind`] at construction time.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`health_check`](VectorStore::health_check) | Liveness probe; reports, never fails |
//! | [`upsert`](VectorStore::upsert) | Insert or replace one point, provisioning the collection on demand |
//! | [`clear`](VectorStore::clear) | Drop a collection and its schema |
//! | [`search`](VectorStore::search) | Cosine similarity search, best first |
//!
//! A variant that cannot perform an operation returns
//! [`StoreError::Unsupported`] rather than silently doing nothing.

pub mod memory;

use crate::error::StoreError;
use crate::models::{Ack, BackendKind, HealthStatus, IndexedPoint, SearchResult};

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// Dimensionality new collections are created with.
    pub dims: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            dims: crate::models::DEFAULT_DIMS,
        }
    }
}

/// Abstract vector storage backend.
///
/// All calls block until the backend answers. Implementations are
/// `Send + Sync` but define no ordering between concurrent callers.
pub trait VectorStore: Send + Sync {
    /// Which variant this is.
    fn backend(&self) -> BackendKind;

    /// Independently confirms the backend is alive (e.g. by listing
    /// collections). Backend errors are reported in the status.
    fn health_check(&self) -> HealthStatus;

    /// Inserts or replaces the point with `point.id`.
    ///
    /// Validates the point before any I/O, creates `collection` with the
    /// configured dimensionality and cosine distance if it does not exist,
    /// and rejects vectors whose length differs from the collection's.
    fn upsert(&self, point: &IndexedPoint, collection: &str) -> Result<Ack, StoreError>;

    /// Deletes `collection` and its schema. A missing collection is
    /// [`Ack::NoOp`].
    fn clear(&self, collection: &str) -> Result<Ack, StoreError>;

    /// Returns up to `limit` results sorted by descending score. An empty
    /// or missing collection yields an empty vector.
    fn search(
        &self,
        vector: &[f32],
        collection: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError>;
}

impl<S: VectorStore + ?Sized> VectorStore for Box<S> {
    fn backend(&self) -> BackendKind {
        (**self).backend()
    }
    fn health_check(&self) -> HealthStatus {
        (**self).health_check()
    }
    fn upsert(&self, point: &IndexedPoint, collection: &str) -> Result<Ack, StoreError> {
        (**self).upsert(point, collection)
    }
    fn clear(&self, collection: &str) -> Result<Ack, StoreError> {
        (**self).clear(collection)
    }
    fn search(
        &self,
        vector: &[f32],
        collection: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        (**self).search(vector, collection, limit)
    }
}
