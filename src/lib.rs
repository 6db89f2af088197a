//! # Catalog Vectors
//!
//! Vector ingestion and retrieval for tabular product catalogs.
//!
//! Rows are read from CSV, cleaned into payload-safe records, one text
//! column is turned into embeddings through a swappable provider, and the
//! vectors are written to a pluggable similarity-search backend. A free-text
//! query is then answered with the most similar records.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────────┐
//! │   CSV    │──▶│ Prepare  │──▶│   Embed   │──▶│ Vector store │
//! │ dataset  │   │normalize │   │ provider  │   │ qdrant/memory│
//! └──────────┘   └──────────┘   └───────────┘   └──────┬───────┘
//!                                                      │
//!                               query ──▶ embed ──▶ search
//! ```
//!
//! The backend-independent pieces (normalizer, preparer, traits, in-memory
//! store) live in the `catalog-vectors-core` crate; this crate adds the
//! network providers and backends, configuration and the `cvx` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and secret resolution |
//! | [`dataset`] | CSV loading, cell typing and saving |
//! | [`embedding`] | Local, OpenAI and Gemini providers |
//! | [`store`] | Qdrant, memory, Chroma, MongoDB and Supabase backends |
//! | [`ingest`] | Embedding stage and ingestion pipeline |
//! | [`search`] | Retrieval pipeline |
//! | [`retry`] | Caller-side retry with backoff |
//! | [`error`] | Pipeline errors |

pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
mod http;
pub mod ingest;
pub mod retry;
pub mod search;
pub mod store;
