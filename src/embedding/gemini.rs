//! Google Gemini embedding provider.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use catalog_vectors_core::embedding::EmbeddingProvider;
use catalog_vectors_core::error::ProviderError;
use catalog_vectors_core::models::Embedding;

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

/// Calls `POST {base_url}/models/{model}:embedContent` once per text.
pub struct GeminiProvider {
    client: Client,
    endpoint: String,
    /// Fully qualified resource name, `models/<id>`.
    resource: String,
    model: String,
    dims: usize,
    request_dims: Option<usize>,
}

impl GeminiProvider {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        dims: usize,
        request_dims: Option<usize>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config("missing Gemini API key".to_string()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| ProviderError::Config("invalid Gemini API key".to_string()))?,
        );
        let client = http::build_client(timeout, headers).map_err(|e| {
            ProviderError::Config(format!("failed to build Gemini HTTP client: {}", e))
        })?;
        let id = model.trim_start_matches("models/").to_string();
        Ok(Self {
            client,
            endpoint: format!("{}/models/{}:embedContent", http::trim_base(base_url), id),
            resource: format!("models/{}", id),
            model,
            dims,
            request_dims,
        })
    }
}

impl EmbeddingProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn encode(&self, text: &str) -> Result<Embedding, ProviderError> {
        let request = EmbedContentRequest {
            model: &self.resource,
            content: Content {
                parts: [Part { text }],
            },
            output_dimensionality: self.request_dims,
        };
        debug!(model = %self.model, chars = text.len(), "gemini embed request");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                transient: http::is_transient_error(&e),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Request {
                provider: PROVIDER,
                transient: http::is_transient_status(status),
                message: format!("{}: {}", status, http::error_body(resp)),
            });
        }

        let parsed: EmbedContentResponse =
            resp.json().map_err(|e| ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: e.to_string(),
            })?;
        parsed.into_first()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// `embedContent` answers with `embedding`; the batch endpoint and some
/// proxies answer with `embeddings`. Either is accepted.
#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    #[serde(default)]
    embedding: Option<ContentEmbedding>,
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

impl EmbedContentResponse {
    fn into_first(self) -> Result<Embedding, ProviderError> {
        self.embedding
            .into_iter()
            .chain(self.embeddings)
            .map(|e| e.values)
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "response contained no embedding values".to_string(),
            })
    }
}
