//! Retrieval pipeline: free-text query in, ranked records out.

use anyhow::Result;
use tracing::debug;

use catalog_vectors_core::embedding::EmbeddingProvider;
use catalog_vectors_core::models::SearchResult;
use catalog_vectors_core::store::VectorStore;

use crate::config::Config;
use crate::error::PipelineError;
use crate::retry::RetryPolicy;

pub const DEFAULT_LIMIT: usize = 5;

/// Encodes `query` once and searches `collection` with it.
///
/// Results come back exactly as the store ranked them.
pub fn retrieve(
    query: &str,
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    collection: &str,
    limit: usize,
    retry: &RetryPolicy,
) -> Result<Vec<SearchResult>, PipelineError> {
    let vector = retry
        .run("encode", || provider.encode(query))
        .map_err(PipelineError::Query)?;
    let results = retry
        .run("search", || store.search(&vector, collection, limit))
        .map_err(|source| PipelineError::Search {
            collection: collection.to_string(),
            backend: store.backend(),
            source,
        })?;
    debug!(collection, limit, hits = results.len(), "search finished");
    Ok(results)
}

pub fn run_search(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    query: &str,
    collection: &str,
    limit: usize,
) -> Result<()> {
    let retry = RetryPolicy::from_config(&config.retry);
    let results = retrieve(query, provider, store, collection, limit, &retry)?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let title_column = &config.dataset.text_column;
    for (i, result) in results.iter().enumerate() {
        let title = result
            .payload
            .get(title_column)
            .map(|v| v.to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "(untitled)".to_string());
        println!("{}. [{:.4}] {}", i + 1, result.score, title);
        for (name, value) in &result.payload {
            if name != title_column && !value.is_null() {
                println!("    {}: {}", name, value);
            }
        }
        println!("    id: {}", result.id);
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_vectors_core::error::ProviderError;
    use catalog_vectors_core::models::{Embedding, IndexedPoint, Record};
    use catalog_vectors_core::store::memory::InMemoryStore;
    use catalog_vectors_core::store::StoreOptions;

    struct FixedProvider(Embedding);

    impl EmbeddingProvider for FixedProvider {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.0.len()
        }
        fn encode(&self, _text: &str) -> Result<Embedding, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_retrieve_missing_collection_is_empty() {
        let store = InMemoryStore::new(StoreOptions { dims: 2 });
        let results = retrieve(
            "anything",
            &FixedProvider(vec![1.0, 0.0]),
            &store,
            "nowhere",
            DEFAULT_LIMIT,
            &RetryPolicy::none(),
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_retrieve_respects_limit() {
        let store = InMemoryStore::new(StoreOptions { dims: 2 });
        for id in 1..=4 {
            let point = IndexedPoint::new(id, vec![1.0, id as f32], Record::new());
            store.upsert(&point, "products").unwrap();
        }
        let results = retrieve(
            "q",
            &FixedProvider(vec![1.0, 0.0]),
            &store,
            "products",
            2,
            &RetryPolicy::none(),
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_dimension_mismatch_surfaces_as_search_error() {
        let store = InMemoryStore::new(StoreOptions { dims: 2 });
        store
            .upsert(&IndexedPoint::new(1, vec![1.0, 0.0], Record::new()), "products")
            .unwrap();
        let err = retrieve(
            "q",
            &FixedProvider(vec![1.0, 0.0, 0.0]),
            &store,
            "products",
            DEFAULT_LIMIT,
            &RetryPolicy::none(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Search { .. }));
    }
}
