//! Embedding provider implementations.
//!
//! The [`EmbeddingProvider`] trait lives in the core crate; this module
//! holds the concrete variants and the factory that picks one:
//!
//! - **`local`** ([`LocalProvider`](local::LocalProvider)): fastembed
//!   sentence-embedding model, no network calls after the model download.
//!   Requires the `local-embeddings-fastembed` feature (on by default).
//! - **`openai`** ([`OpenAiProvider`]): OpenAI-compatible `/embeddings`.
//! - **`gemini`** ([`GeminiProvider`]): Google Gemini `embedContent`.
//!
//! Every variant issues exactly one model call per `encode` and never
//! retries; see [`RetryPolicy`](crate::retry::RetryPolicy) for the
//! caller-side retry loop.

pub mod gemini;
#[cfg(feature = "local-embeddings-fastembed")]
pub mod local;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use catalog_vectors_core::embedding::EmbeddingProvider;
use catalog_vectors_core::error::ProviderError;

use crate::config::EmbeddingConfig;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Local models with their native dimensionality.
pub const LOCAL_MODELS: &[(&str, usize)] = &[
    ("all-minilm-l6-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
    ("bge-large-en-v1.5", 1024),
    ("nomic-embed-text-v1", 768),
    ("nomic-embed-text-v1.5", 768),
    ("multilingual-e5-small", 384),
    ("multilingual-e5-base", 768),
    ("multilingual-e5-large", 1024),
];

/// Hosted models with their default dimensionality.
const REMOTE_MODELS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
    ("gemini-embedding-001", 3072),
    ("text-embedding-004", 768),
    ("embedding-001", 768),
];

/// Embedding provider variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Local,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Local => "all-minilm-l6-v2",
            ProviderKind::OpenAi => "text-embedding-3-small",
            ProviderKind::Gemini => "gemini-embedding-001",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "sentence_transformers" => Ok(ProviderKind::Local),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Resolves the model name and vector size for `kind`.
///
/// An explicit `embedding.dims` wins; otherwise the size comes from the
/// known-model tables. Unknown models need an explicit size.
fn resolve_model(kind: ProviderKind, config: &EmbeddingConfig) -> Result<(String, usize), ProviderError> {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| kind.default_model().to_string());
    if let Some(dims) = config.dims {
        return Ok((model, dims));
    }
    let table = match kind {
        ProviderKind::Local => LOCAL_MODELS,
        ProviderKind::OpenAi | ProviderKind::Gemini => REMOTE_MODELS,
    };
    let bare = model.trim_start_matches("models/");
    table
        .iter()
        .find(|(name, _)| *name == bare)
        .map(|(_, dims)| (model.clone(), *dims))
        .ok_or_else(|| {
            ProviderError::Config(format!(
                "embedding.dims is required for unrecognized {} model '{}'",
                kind, model
            ))
        })
}

/// Create the [`EmbeddingProvider`] selected by `config.provider`.
///
/// `api_key` is the already-resolved secret for remote providers; this
/// function never reads the environment.
///
/// # Errors
///
/// [`ProviderError::UnknownProvider`] for an unrecognized provider name,
/// [`ProviderError::Config`] for a missing key, unknown model, or a
/// local provider built without the fastembed feature.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> Result<Box<dyn EmbeddingProvider>, ProviderError> {
    let kind: ProviderKind = config.provider.parse()?;
    let (model, dims) = resolve_model(kind, config)?;
    let timeout = Duration::from_secs(config.timeout_secs);
    let require_key = || {
        api_key.ok_or_else(|| {
            ProviderError::Config(format!(
                "{} provider requires an API key (set {})",
                kind,
                config.api_key_var().unwrap_or_default()
            ))
        })
    };

    match kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::new(
            require_key()?,
            config.base_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL),
            model,
            dims,
            config.dims,
            timeout,
        )?)),
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider::new(
            require_key()?,
            config.base_url.as_deref().unwrap_or(gemini::DEFAULT_BASE_URL),
            model,
            dims,
            config.dims,
            timeout,
        )?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        ProviderKind::Local => Ok(Box::new(local::LocalProvider::new(model, dims)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        ProviderKind::Local => Err(ProviderError::Config(
            "local embedding provider requires --features local-embeddings-fastembed".to_string(),
        )),
    }
}
