//! Chroma backend. Only the heartbeat is wired up; data operations report
//! [`StoreError::Unsupported`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;

use catalog_vectors_core::error::StoreError;
use catalog_vectors_core::models::{Ack, BackendKind, HealthStatus, IndexedPoint, SearchResult};
use catalog_vectors_core::store::VectorStore;

use crate::http;

pub const DEFAULT_PORT: u16 = 8123;

const BACKEND: BackendKind = BackendKind::Chroma;

pub struct ChromaStore {
    client: Client,
    base: String,
}

impl ChromaStore {
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, StoreError> {
        if host.trim().is_empty() {
            return Err(StoreError::Connection {
                backend: BACKEND,
                message: "host must not be empty".to_string(),
                transient: false,
            });
        }
        let client =
            http::build_client(timeout, HeaderMap::new()).map_err(|e| StoreError::Connection {
                backend: BACKEND,
                message: format!("failed to build HTTP client: {}", e),
                transient: false,
            })?;
        Ok(Self {
            client,
            base: base_url(host, port),
        })
    }
}

fn base_url(host: &str, port: u16) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}:{}", http::trim_base(host), port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

impl VectorStore for ChromaStore {
    fn backend(&self) -> BackendKind {
        BACKEND
    }

    fn health_check(&self) -> HealthStatus {
        let url = format!("{}/api/v2/heartbeat", self.base);
        match self.client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => {
                HealthStatus::ok(format!("chroma at {} is alive (data operations not supported)", self.base))
            }
            Ok(resp) => HealthStatus::failed(format!(
                "chroma heartbeat returned {}",
                resp.status()
            )),
            Err(e) => HealthStatus::failed(format!("chroma unreachable: {}", e)),
        }
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
