//! Error types shared by every catalog-vectors component.
//!
//! Each variant that crosses a network boundary knows whether it is
//! transient (see [`StoreError::is_transient`] and
//! [`ProviderError::is_transient`]); retry decisions are made by callers.

use thiserror::Error;

use crate::models::BackendKind;

/// Failure of a vector-store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The point failed shape validation; nothing was sent to the backend.
    #[error("invalid point {id}: {reason}")]
    InvalidPoint { id: u64, reason: String },

    #[error(
        "dimension mismatch in collection '{collection}': expected {expected}, got {actual}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// The backend could not be reached, rejected our credentials, or was
    /// given connection parameters of the wrong shape.
    #[error("{backend} connection error: {message}")]
    Connection {
        backend: BackendKind,
        message: String,
        transient: bool,
    },

    /// The backend answered, but with an error.
    #[error("{backend} error on collection '{collection}': {message}")]
    Backend {
        backend: BackendKind,
        collection: String,
        message: String,
        transient: bool,
    },

    #[error("{backend} backend does not support '{operation}' yet")]
    Unsupported {
        backend: BackendKind,
        operation: &'static str,
    },
}

impl StoreError {
    /// Error for a data operation a partial backend does not implement.
    pub fn unsupported(backend: BackendKind, operation: &'static str) -> Self {
        StoreError::Unsupported { backend, operation }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connection { transient, .. } | StoreError::Backend { transient, .. } => {
                *transient
            }
            _ => false,
        }
    }
}

/// Failure to construct or call an embedding provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unknown embedding provider '{0}'. Must be local, openai, or gemini")]
    UnknownProvider(String),

    /// Missing model, key, feature flag, or other construction-time setting.
    #[error("embedding provider misconfigured: {0}")]
    Config(String),

    #[error("{provider} embedding request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
        transient: bool,
    },

    #[error("{provider} returned an unusable embedding response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Request { transient: true, .. })
    }
}

/// Errors raised while preparing a tabular dataset.
#[derive(Error, Debug, PartialEq)]
pub enum DatasetError {
    #[error("column '{0}' not found in dataset")]
    UnknownColumn(String),

    /// Records are keyed by column name, so header names must be unique.
    #[error("column '{0}' appears more than once in the header")]
    DuplicateColumn(String),

    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// A list literal that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at byte {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_flagged_errors_are_transient() {
        let busy = StoreError::Backend {
            backend: BackendKind::Qdrant,
            collection: "products".to_string(),
            message: "503".to_string(),
            transient: true,
        };
        assert!(busy.is_transient());

        let bad = StoreError::InvalidPoint {
            id: 0,
            reason: "id must be positive".to_string(),
        };
        assert!(!bad.is_transient());

        let unsupported = StoreError::unsupported(BackendKind::Chroma, "upsert");
        assert!(!unsupported.is_transient());
        assert_eq!(
            unsupported.to_string(),
            "chroma backend does not support 'upsert' yet"
        );
    }

    #[test]
    fn test_provider_transience() {
        let quota = ProviderError::Request {
            provider: "openai",
            message: "429 Too Many Requests".to_string(),
            transient: true,
        };
        assert!(quota.is_transient());
        assert!(!ProviderError::UnknownProvider("bert".to_string()).is_transient());
    }
}
