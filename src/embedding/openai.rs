//! OpenAI-compatible embedding provider.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use catalog_vectors_core::embedding::EmbeddingProvider;
use catalog_vectors_core::error::ProviderError;
use catalog_vectors_core::models::Embedding;

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "openai";

/// Calls `POST {base_url}/embeddings` once per [`encode`](EmbeddingProvider::encode).
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    dims: usize,
    /// Sent as `dimensions` when the caller asked for a specific size.
    request_dims: Option<usize>,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        dims: usize,
        request_dims: Option<usize>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config("missing OpenAI API key".to_string()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| ProviderError::Config("invalid OpenAI API key".to_string()))?,
        );
        let client = http::build_client(timeout, headers).map_err(|e| {
            ProviderError::Config(format!("failed to build OpenAI HTTP client: {}", e))
        })?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", http::trim_base(base_url)),
            model,
            dims,
            request_dims,
        })
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn encode(&self, text: &str) -> Result<Embedding, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
            dimensions: self.request_dims,
        };
        debug!(model = %self.model, chars = text.len(), "openai embed request");
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

        let parsed: EmbeddingResponse = resp.json().map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;
        first_embedding(parsed)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

fn first_embedding(response: EmbeddingResponse) -> Result<Embedding, ProviderError> {
    response
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .map(|d| d.embedding)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ProviderError::InvalidResponse {
            provider: PROVIDER,
            message: "response contained no embedding".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Embedding, ProviderError> {
        first_embedding(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_unwraps_first_embedding_by_index() {
        let json = r#"{"object":"list","data":[
            {"object":"embedding","index":1,"embedding":[9.0]},
            {"object":"embedding","index":0,"embedding":[0.5,-0.25]}
        ],"model":"text-embedding-3-small"}"#;
        assert_eq!(parse(json).unwrap(), vec![0.5, -0.25]);
    }

    #[test]
    fn test_empty_data_is_invalid() {
        let err = parse(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }

    #[test]
    fn test_request_shape() {
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: ["Phone A"],
            dimensions: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "text-embedding-3-small", "input": ["Phone A"]})
        );
    }

    #[test]
    fn test_blank_key_rejected() {
        let err = OpenAiProvider::new(
            " ",
            DEFAULT_BASE_URL,
            "text-embedding-3-small".to_string(),
            1536,
            None,
            Duration::from_secs(5),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ProviderError::Config(_)));
    }
}
