//! In-memory [`VectorStore`] implementation for testing and dry runs.
//!
//! Uses `HashMap`s behind `std::sync::RwLock`. Search is brute-force
//! cosine similarity over every point in the collection.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::embedding::cosine_similarity;
use crate::error::StoreError;
use crate::models::{
    sort_by_score, Ack, BackendKind, Embedding, HealthStatus, IndexedPoint, Record, SearchResult,
};

use super::{StoreOptions, VectorStore};

struct StoredPoint {
    vector: Embedding,
    payload: Record,
}

struct Collection {
    dims: usize,
    points: HashMap<u64, StoredPoint>,
}

/// In-memory store. State lives only as long as the value.
pub struct InMemoryStore {
    options: StoreOptions,
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of points in `collection`, or `None` if it does not exist.
    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .ok()?
            .get(collection)
            .map(|c| c.points.len())
    }

    fn poisoned(&self, collection: &str) -> StoreError {
        StoreError::Backend {
            backend: BackendKind::Memory,
            collection: collection.to_string(),
            message: "store lock poisoned".to_string(),
            transient: false,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

impl VectorStore for InMemoryStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn health_check(&self) -> HealthStatus {
        match self.collections.read() {
            Ok(collections) => HealthStatus::ok(format!(
                "in-memory store with {} collection(s)",
                collections.len()
            )),
            Err(_) => HealthStatus::failed("in-memory store lock poisoned"),
        }
    }

    fn upsert(&self, point: &IndexedPoint, collection: &str) -> Result<Ack, StoreError> {
        point.validate()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| self.poisoned(collection))?;
        let dims = collections
            .get(collection)
            .map_or(self.options.dims, |c| c.dims);
        if point.vector.len() != dims {
            return Err(StoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: dims,
                actual: point.vector.len(),
            });
        }
        let entry = collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection {
                dims,
                points: HashMap::new(),
            });
        entry.points.insert(
            point.id,
            StoredPoint {
                vector: point.vector.clone(),
                payload: point.payload.clone(),
            },
        );
        Ok(Ack::Applied)
    }

    fn clear(&self, collection: &str) -> Result<Ack, StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| self.poisoned(collection))?;
        Ok(match collections.remove(collection) {
            Some(_) => Ack::Applied,
            None => Ack::NoOp,
        })
    }

    fn search(
        &self,
        vector: &[f32],
        collection: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| self.poisoned(collection))?;
        let Some(stored) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        if vector.len() != stored.dims {
            return Err(StoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: stored.dims,
                actual: vector.len(),
            });
        }
        let mut results: Vec<SearchResult> = stored
            .points
            .iter()
            .map(|(id, p)| SearchResult {
                id: *id,
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        sort_by_score(&mut results);
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn store(dims: usize) -> InMemoryStore {
        InMemoryStore::new(StoreOptions { dims })
    }

    fn point(id: u64, vector: Vec<f32>, name: &str) -> IndexedPoint {
        let mut payload = Record::new();
        payload.insert("name".to_string(), CellValue::Text(name.to_string()));
        IndexedPoint::new(id, vector, payload)
    }

    #[test]
    fn test_self_search_scores_one() {
        let s = store(3);
        s.upsert(&point(1, vec![0.2, 0.4, 0.9], "only"), "c").unwrap();
        let results = s.search(&[0.2, 0.4, 0.9], "c", 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let s = store(2);
        s.upsert(&point(1, vec![1.0, 0.0], "first"), "c").unwrap();
        s.upsert(&point(1, vec![0.0, 1.0], "second"), "c").unwrap();
        assert_eq!(s.point_count("c"), Some(1));
        let results = s.search(&[0.0, 1.0], "c", 5).unwrap();
        assert_eq!(
            results[0].payload["name"],
            CellValue::Text("second".to_string())
        );
    }

    #[test]
    fn test_results_sorted_and_limited() {
        let s = store(2);
        s.upsert(&point(1, vec![1.0, 0.0], "x"), "c").unwrap();
        s.upsert(&point(2, vec![0.7, 0.7], "xy"), "c").unwrap();
        s.upsert(&point(3, vec![0.0, 1.0], "y"), "c").unwrap();
        let results = s.search(&[1.0, 0.1], "c", 2).unwrap();
        let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_clear_missing_collection_is_noop() {
        let s = store(2);
        assert_eq!(s.clear("nope").unwrap(), Ack::NoOp);
        s.upsert(&point(1, vec![1.0, 0.0], "x"), "c").unwrap();
        assert_eq!(s.clear("c").unwrap(), Ack::Applied);
        assert_eq!(s.point_count("c"), None);
    }

    #[test]
    fn test_search_missing_or_cleared_collection_is_empty() {
        let s = store(2);
        assert!(s.search(&[1.0, 0.0], "nope", 5).unwrap().is_empty());
        s.upsert(&point(1, vec![1.0, 0.0], "x"), "c").unwrap();
        s.clear("c").unwrap();
        assert!(s.search(&[1.0, 0.0], "c", 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let s = store(3);
        let err = s.upsert(&point(1, vec![1.0, 0.0], "x"), "c").unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        // A rejected first point leaves nothing behind.
        assert_eq!(s.point_count("c"), None);
        assert_eq!(s.clear("c").unwrap(), Ack::NoOp);
    }

    #[test]
    fn test_invalid_point_rejected_before_collection_created() {
        let s = store(2);
        let err = s.upsert(&point(0, vec![1.0, 0.0], "x"), "c").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPoint { .. }));
        assert_eq!(s.point_count("c"), None);
    }

    #[test]
    fn test_health_check_reports_ok() {
        let status = store(2).health_check();
        assert!(status.healthy);
        assert!(status.message.contains("0 collection"));
    }
}
