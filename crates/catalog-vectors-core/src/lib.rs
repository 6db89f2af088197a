//! # catalog-vectors core
//!
//! Backend-agnostic logic for catalog-vectors: the record data model,
//! list-literal parsing and value normalization, the record preparer,
//! and the [`EmbeddingProvider`](embedding::EmbeddingProvider) and
//! [`VectorStore`](store::VectorStore) capability traits.
//!
//! This crate performs no network or filesystem I/O. Concrete providers
//! (fastembed, OpenAI, Gemini) and remote backends (Qdrant, Chroma,
//! MongoDB, Supabase) live in the `catalog-vectors` app crate; the only
//! backend implemented here is [`InMemoryStore`](store::memory::InMemoryStore).

pub mod embedding;
pub mod error;
pub mod literal;
pub mod models;
pub mod normalize;
pub mod prepare;
pub mod store;
