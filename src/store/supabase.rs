//! Supabase backend. Health is probed through the PostgREST root; data
//! operations report [`StoreError::Unsupported`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use catalog_vectors_core::error::StoreError;
use catalog_vectors_core::models::{Ack, BackendKind, HealthStatus, IndexedPoint, SearchResult};
use catalog_vectors_core::store::VectorStore;

use crate::http;

const BACKEND: BackendKind = BackendKind::Supabase;

pub struct SupabaseStore {
    client: Client,
    base: String,
}

impl SupabaseStore {
    pub fn connect(url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let invalid = |message: &str| StoreError::Connection {
            backend: BACKEND,
            message: message.to_string(),
            transient: false,
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("url must be an http(s) URL"));
        }
        let key = api_key.trim();
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key).map_err(|_| invalid("invalid API key"))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| invalid("invalid API key"))?,
        );
        let client = http::build_client(timeout, headers)
            .map_err(|e| invalid(&format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base: http::trim_base(url),
        })
    }
}

impl VectorStore for SupabaseStore {
    fn backend(&self) -> BackendKind {
        BACKEND
    }

    fn health_check(&self) -> HealthStatus {
        match self.client.get(format!("{}/rest/v1/", self.base)).send() {
            Ok(resp) if resp.status().is_success() => HealthStatus::ok(format!(
                "supabase at {} is reachable (data operations not supported)",
                self.base
            )),
            Ok(resp) => HealthStatus::failed(format!("supabase returned {}", resp.status())),
            Err(e) => HealthStatus::failed(format!("supabase unreachable: {}", e)),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_url() {
        assert!(SupabaseStore::connect("db.example", "key", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_upsert_unsupported() {
        let store =
            SupabaseStore::connect("http://127.0.0.1:1", "key", Duration::from_secs(1)).unwrap();
        let err = store
            .upsert(&IndexedPoint::new(1, vec![1.0], Default::default()), "products")
            .unwrap_err();
        assert_eq!(err.to_string(), "supabase backend does not support 'upsert' yet");
        assert!(!store.health_check().healthy);
    }
}
