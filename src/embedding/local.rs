//! Local sentence-embedding provider backed by fastembed.
//!
//! The model is downloaded from Hugging Face on first use and cached;
//! after that every [`encode`](EmbeddingProvider::encode) is an offline
//! forward pass.

use std::sync::Mutex;

use tracing::info;

use catalog_vectors_core::embedding::EmbeddingProvider;
use catalog_vectors_core::error::ProviderError;
use catalog_vectors_core::models::Embedding;

const PROVIDER: &str = "local";

pub struct LocalProvider {
    model_name: String,
    dims: usize,
    model: Mutex<fastembed::TextEmbedding>,
}

impl LocalProvider {
    /// Loads `model_name`. Blocks while the model is fetched on first use.
    pub fn new(model_name: String, dims: usize) -> Result<Self, ProviderError> {
        let fastembed_model = to_fastembed_model(&model_name)?;
        info!(model = %model_name, "loading local embedding model");
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
        )
        .map_err(|e| {
            ProviderError::Config(format!("failed to initialize local embedding model: {}", e))
        })?;
        Ok(Self {
            model_name,
            dims,
            model: Mutex::new(model),
        })
    }
}

impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn encode(&self, text: &str) -> Result<Embedding, ProviderError> {
        let mut model = self.model.lock().map_err(|_| ProviderError::Request {
            provider: PROVIDER,
            message: "embedding model lock poisoned".to_string(),
            transient: false,
        })?;
        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                message: e.to_string(),
                transient: false,
            })?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "model returned no embedding".to_string(),
            })
    }
}

fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel, ProviderError> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => Err(ProviderError::Config(format!(
            "unknown local embedding model: '{}'. Supported models: {}",
            other,
            super::LOCAL_MODELS
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
