//! MongoDB backend placeholder.
//!
//! No MongoDB driver is linked, so the connection string is only checked
//! for shape. Health reports that, and data operations report
//! [`StoreError::Unsupported`].

use catalog_vectors_core::error::StoreError;
use catalog_vectors_core::models::{Ack, BackendKind, HealthStatus, IndexedPoint, SearchResult};
use catalog_vectors_core::store::VectorStore;

const BACKEND: BackendKind = BackendKind::MongoDb;

pub struct MongoStore {
    /// Host part of the connection string, credentials stripped.
    host: String,
}

impl MongoStore {
    pub fn connect(uri: &str) -> Result<Self, StoreError> {
        let rest = uri
            .trim()
            .strip_prefix("mongodb+srv://")
            .or_else(|| uri.trim().strip_prefix("mongodb://"))
            .ok_or_else(|| StoreError::Connection {
                backend: BACKEND,
                message: "connection string must start with mongodb:// or mongodb+srv://"
                    .to_string(),
                transient: false,
            })?;
        let authority = rest.split(['/', '?']).next().unwrap_or_default();
        let host = authority.rsplit('@').next().unwrap_or_default().to_string();
        if host.is_empty() {
            return Err(StoreError::Connection {
                backend: BACKEND,
                message: "connection string has no host".to_string(),
                transient: false,
            });
        }
        Ok(Self { host })
    }
}

impl VectorStore for MongoStore {
    fn backend(&self) -> BackendKind {
        BACKEND
    }

    fn health_check(&self) -> HealthStatus {
        HealthStatus::failed(format!(
            "mongodb at {}: not implemented (no driver available)",
            self.host
        ))
    }

    fn upsert(&self, _point: &IndexedPoint, _collection: &str) -> Result<Ack, StoreError> {
        Err(StoreError::unsupported(BACKEND, "upsert"))
    }

    fn clear(&self, _collection: &str) -> Result<Ack, StoreError> {
        Err(StoreError::unsupported(BACKEND, "clear"))
    }

    fn search(
        &self,
        _vector: &[f32],
        _collection: &str,
        _limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        Err(StoreError::unsupported(BACKEND, "search"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_extracted_without_credentials() {
        let store = MongoStore::connect("mongodb+srv://user:pw@cluster0.example.net/?retryWrites=true")
            .unwrap();
        assert_eq!(store.host, "cluster0.example.net");
        let status = store.health_check();
        assert!(!status.healthy);
        assert!(!status.message.contains("pw"));
    }

    #[test]
    fn test_bad_scheme_rejected() {
        assert!(matches!(
            MongoStore::connect("postgres://db"),
            Err(StoreError::Connection { .. })
        ));
        assert!(MongoStore::connect("mongodb://").is_err());
    }
}
