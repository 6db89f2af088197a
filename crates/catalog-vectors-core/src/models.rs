//! Core data types that flow through the ingestion and retrieval pipeline.
//!
//! Raw cells arrive as [`RawValue`], are normalized into [`CellValue`]
//! scalars, grouped into a [`Record`] per row, and paired with an
//! [`Embedding`] to become an [`IndexedPoint`].

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use ndarray::ArrayD;

use crate::error::StoreError;

/// Dimensionality collections are provisioned with unless configured otherwise.
pub const DEFAULT_DIMS: usize = 1536;

/// Column name the embedding is attached under. Never part of a payload.
pub const EMBEDDING_FIELD: &str = "embedding";

/// A fixed-length embedding vector.
pub type Embedding = Vec<f32>;

/// One row of prepared data: column name → normalized scalar, in column order.
pub type Record = IndexMap<String, CellValue>;

/// An unnormalized cell as handed over by a dataset reader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<RawValue>),
    /// An n-dimensional array; flattened in row-major order when normalized.
    Array(ArrayD<RawValue>),
}

impl RawValue {
    pub fn is_non_finite(&self) -> bool {
        matches!(self, RawValue::Float(f) if !f.is_finite())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}

/// A normalized scalar, safe to store as payload metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Int(i) => serde_json::Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Converts a JSON payload field back into a scalar.
    ///
    /// Nested arrays and objects, which other writers may have stored in
    /// the same collection, are kept as their compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => n.as_f64().map_or(CellValue::Null, CellValue::Float),
            },
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// Display form used for embedding input and CSV output. Null is empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Converts a record into a JSON object payload.
pub fn record_to_json(record: &Record) -> serde_json::Map<String, serde_json::Value> {
    record
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

/// Converts a JSON object payload back into a record.
pub fn record_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Record {
    map.iter()
        .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
        .collect()
}

/// A vector plus its metadata, ready to be written to a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub id: u64,
    pub vector: Embedding,
    pub payload: Record,
}

impl IndexedPoint {
    /// Builds a point, dropping any `embedding` column from the payload.
    pub fn new(id: u64, vector: Embedding, mut payload: Record) -> Self {
        payload.shift_remove(EMBEDDING_FIELD);
        Self {
            id,
            vector,
            payload,
        }
    }

    /// Shape validation every backend runs before touching the network.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id == 0 {
            return Err(StoreError::InvalidPoint {
                id: self.id,
                reason: "id must be a positive integer".to_string(),
            });
        }
        if self.vector.is_empty() {
            return Err(StoreError::InvalidPoint {
                id: self.id,
                reason: "vector is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// One ranked hit returned by a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: u64,
    pub score: f32,
    pub payload: Record,
}

/// Sorts results by descending score. NaN scores sink to the end.
pub fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or_else(|| a.score.is_nan().cmp(&b.score.is_nan()))
    });
}

/// Outcome of a data-mutating store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The backend changed state.
    Applied,
    /// There was nothing to do (e.g. clearing a collection that does not exist).
    NoOp,
}

/// Result of a liveness probe. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

impl HealthStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

/// Vector store backend variants, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Qdrant,
    Memory,
    Chroma,
    MongoDb,
    Supabase,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Qdrant,
        BackendKind::Memory,
        BackendKind::Chroma,
        BackendKind::MongoDb,
        BackendKind::Supabase,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Qdrant => "qdrant",
            BackendKind::Memory => "memory",
            BackendKind::Chroma => "chroma",
            BackendKind::MongoDb => "mongodb",
            BackendKind::Supabase => "supabase",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(BackendKind::Qdrant),
            "memory" => Ok(BackendKind::Memory),
            "chroma" | "chromadb" => Ok(BackendKind::Chroma),
            "mongodb" | "mongo" => Ok(BackendKind::MongoDb),
            "supabase" => Ok(BackendKind::Supabase),
            other => Err(format!(
                "Unknown vector store backend: '{}'. Must be qdrant, memory, chroma, mongodb, or supabase.",
                other
            )),
        }
    }
}
