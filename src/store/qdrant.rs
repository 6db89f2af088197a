//! Qdrant backend over the REST API.
//!
//! Collections are created on first upsert with cosine distance and the
//! configured size. The size of each collection is cached after the first
//! lookup so repeat upserts cost one request.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use catalog_vectors_core::error::StoreError;
use catalog_vectors_core::models::{
    record_from_json, record_to_json, sort_by_score, Ack, BackendKind, HealthStatus,
    IndexedPoint, SearchResult,
};
use catalog_vectors_core::store::{StoreOptions, VectorStore};

use crate::http;

const BACKEND: BackendKind = BackendKind::Qdrant;

pub struct QdrantStore {
    client: Client,
    base: Url,
    options: StoreOptions,
    sizes: Mutex<HashMap<String, usize>>,
}

impl QdrantStore {
    /// Builds a client and probes the server by listing collections.
    pub fn connect(
        url: &str,
        api_key: Option<&str>,
        options: StoreOptions,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key).map_err(|_| connection("invalid API key", false))?,
            );
        }
        let base = Url::parse(url.trim())
            .map_err(|e| connection(&format!("invalid url '{}': {}", url, e), false))?;
        if base.cannot_be_a_base() {
            return Err(connection(&format!("invalid url '{}'", url), false));
        }
        let client = http::build_client(timeout, headers)
            .map_err(|e| connection(&format!("failed to build HTTP client: {}", e), false))?;
        let store = Self {
            client,
            base,
            options,
            sizes: Mutex::new(HashMap::new()),
        };
        let collections = store.list_collections().map_err(|e| match e {
            StoreError::Connection { .. } => e,
            other => connection(&other.to_string(), other.is_transient()),
        })?;
        info!(url = %store.base, collections = collections.len(), "connected to qdrant");
        Ok(store)
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let resp = self.send("", self.client.get(endpoint(&self.base, &["collections"])?))?;
        let parsed: Envelope<CollectionList> = self.parse("", check("", resp)?)?;
        Ok(parsed.result.collections.into_iter().map(|c| c.name).collect())
    }

    /// Vector size of `collection`, or `None` when it does not exist.
    fn fetch_size(&self, collection: &str) -> Result<Option<usize>, StoreError> {
        let resp = self.send(collection, self.client.get(self.collection_url(collection, &[])?))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let parsed: Envelope<Value> = self.parse(collection, check(collection, resp)?)?;
        vector_size(&parsed.result)
            .map(Some)
            .ok_or_else(|| backend_error(collection, "collection has no single unnamed vector", false))
    }

    /// Creates `collection`. Returns `false` when it already exists.
    fn create(&self, collection: &str) -> Result<bool, StoreError> {
        let body = CreateCollection {
            vectors: VectorParams {
                size: self.options.dims,
                distance: "Cosine",
            },
        };
        let resp = self.send(
            collection,
            self.client.put(self.collection_url(collection, &[])?).json(&body),
        )?;
        if resp.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        check(collection, resp)?;
        info!(collection, dims = self.options.dims, "created qdrant collection");
        Ok(true)
    }

    /// Returns the collection's vector size, creating it if needed.
    fn ensure_collection(&self, collection: &str) -> Result<usize, StoreError> {
        if let Some(size) = self.cached_size(collection) {
            return Ok(size);
        }
        let size = match self.fetch_size(collection)? {
            Some(size) => size,
            None if self.create(collection)? => self.options.dims,
            // Lost a creation race with another writer.
            None => self
                .fetch_size(collection)?
                .ok_or_else(|| backend_error(collection, "collection creation failed", true))?,
        };
        if let Ok(mut sizes) = self.sizes.lock() {
            sizes.insert(collection.to_string(), size);
        }
        Ok(size)
    }

    fn cached_size(&self, collection: &str) -> Option<usize> {
        self.sizes.lock().ok()?.get(collection).copied()
    }

    fn forget(&self, collection: &str) {
        if let Ok(mut sizes) = self.sizes.lock() {
            sizes.remove(collection);
        }
    }

    fn collection_url(&self, collection: &str, tail: &[&str]) -> Result<Url, StoreError> {
        let mut segments = vec!["collections", collection];
        segments.extend_from_slice(tail);
        endpoint(&self.base, &segments)
    }

    fn send(&self, collection: &str, request: RequestBuilder) -> Result<Response, StoreError> {
        request.send().map_err(|e| {
            debug!(collection, error = %e, "qdrant request failed");
            connection(&e.to_string(), http::is_transient_error(&e))
        })
    }

    fn parse<T: for<'de> Deserialize<'de>>(
        &self,
        collection: &str,
        resp: Response,
    ) -> Result<T, StoreError> {
        resp.json()
            .map_err(|e| backend_error(collection, &format!("unreadable response: {}", e), false))
    }
}

impl VectorStore for QdrantStore {
    fn backend(&self) -> BackendKind {
        BACKEND
    }

    fn health_check(&self) -> HealthStatus {
        match self.list_collections() {
            Ok(names) => HealthStatus::ok(format!(
                "qdrant at {} with {} collection(s)",
                self.base,
                names.len()
            )),
            Err(e) => HealthStatus::failed(e.to_string()),
        }
    }

    fn upsert(&self, point: &IndexedPoint, collection: &str) -> Result<Ack, StoreError> {
        point.validate()?;
        let size = self.ensure_collection(collection)?;
        if point.vector.len() != size {
            return Err(StoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: size,
                actual: point.vector.len(),
            });
        }
        let body = UpsertPoints {
            points: [WirePoint {
                id: point.id,
                vector: &point.vector,
                payload: record_to_json(&point.payload),
            }],
        };
        let resp = self.send(
            collection,
            self.client
                .put(self.collection_url(collection, &["points"])?)
                .query(&[("wait", "true")])
                .json(&body),
        )?;
        if resp.status() == StatusCode::NOT_FOUND {
            // Dropped behind our back; the next attempt recreates it.
            self.forget(collection);
            return Err(backend_error(collection, "collection disappeared during upsert", true));
        }
        check(collection, resp)?;
        debug!(collection, id = point.id, "upserted point");
        Ok(Ack::Applied)
    }

    fn clear(&self, collection: &str) -> Result<Ack, StoreError> {
        let resp = self.send(
            collection,
            self.client.delete(self.collection_url(collection, &[])?),
        )?;
        self.forget(collection);
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Ack::NoOp);
        }
        let parsed: Envelope<Value> = self.parse(collection, check(collection, resp)?)?;
        Ok(match parsed.result {
            Value::Bool(false) => Ack::NoOp,
            _ => Ack::Applied,
        })
    }

    fn search(
        &self,
        vector: &[f32],
        collection: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if let Some(size) = self.cached_size(collection) {
            if vector.len() != size {
                return Err(StoreError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: size,
                    actual: vector.len(),
                });
            }
        }
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        let resp = self.send(
            collection,
            self.client
                .post(self.collection_url(collection, &["points", "search"])?)
                .json(&body),
        )?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let parsed: Envelope<Vec<ScoredPoint>> = self.parse(collection, check(collection, resp)?)?;
        let mut results = into_results(parsed.result, collection);
        sort_by_score(&mut results);
        results.truncate(limit);
        Ok(results)
    }
}

/// Appends percent-encoded path segments to `base`.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, StoreError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| connection(&format!("invalid url '{}'", base), false))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn connection(message: &str, transient: bool) -> StoreError {
    StoreError::Connection {
        backend: BACKEND,
        message: message.to_string(),
        transient,
    }
}

fn backend_error(collection: &str, message: &str, transient: bool) -> StoreError {
    StoreError::Backend {
        backend: BACKEND,
        collection: collection.to_string(),
        message: message.to_string(),
        transient,
    }
}

/// Maps non-success statuses to errors; 401/403 count as connection failures.
fn check(collection: &str, resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = format!("{}: {}", status, http::error_body(resp));
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(connection(&message, false));
    }
    Err(backend_error(collection, &message, http::is_transient_status(status)))
}

/// Reads `config.params.vectors.size` from a collection-info result.
fn vector_size(info: &Value) -> Option<usize> {
    info.pointer("/config/params/vectors/size")?
        .as_u64()
        .map(|n| n as usize)
}

fn into_results(points: Vec<ScoredPoint>, collection: &str) -> Vec<SearchResult> {
    points
        .into_iter()
        .filter_map(|p| {
            let Some(id) = p.id.as_u64() else {
                warn!(collection, id = %p.id, "skipping point with non-integer id");
                return None;
            };
            Some(SearchResult {
                id,
                score: p.score,
                payload: p.payload.as_ref().map(record_from_json).unwrap_or_default(),
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionList {
    #[serde(default)]
    collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Serialize)]
struct UpsertPoints<'a> {
    points: [WirePoint<'a>; 1],
}

#[derive(Serialize)]
struct WirePoint<'a> {
    id: u64,
    vector: &'a [f32],
    payload: serde_json::Map<String, Value>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Map<String, Value>>,
}
