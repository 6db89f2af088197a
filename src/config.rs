//! TOML configuration.
//!
//! Every setting the pipeline needs is read from one file and passed to
//! constructors explicitly. Secrets are never stored in the file: the
//! config names the environment variable that holds them, and
//! [`Config::resolve_secrets`] looks them up through a caller-supplied
//! function so library code never touches the process environment.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use catalog_vectors_core::models::{BackendKind, DEFAULT_DIMS};

use crate::embedding::ProviderKind;
use crate::ingest::FailurePolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    /// Free-text column that gets embedded.
    pub text_column: String,
    /// Column holding list-like values to normalize.
    pub list_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Environment variable holding the API key for remote providers.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Override for the provider's API root.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    /// Environment variable the API key is read from, if the provider needs one.
    pub fn api_key_var(&self) -> Option<String> {
        if let Some(var) = &self.api_key_env {
            return Some(var.clone());
        }
        match self.provider.parse::<ProviderKind>() {
            Ok(ProviderKind::OpenAi) => Some("OPENAI_API_KEY".to_string()),
            Ok(ProviderKind::Gemini) => Some("GEMINI_API".to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Qdrant / Supabase endpoint.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Chroma host and port.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Environment variable holding a MongoDB connection string.
    #[serde(default)]
    pub connection_string_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            collection: default_collection(),
            dims: default_dims(),
            url: None,
            api_key_env: None,
            host: None,
            port: None,
            connection_string_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend() -> String {
    "qdrant".to_string()
}
fn default_collection() -> String {
    "products".to_string()
}
fn default_dims() -> usize {
    DEFAULT_DIMS
}

impl StoreConfig {
    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend
            .parse::<BackendKind>()
            .map_err(|e| anyhow::anyhow!(e))
    }

    fn api_key_var(&self) -> Option<String> {
        if let Some(var) = &self.api_key_env {
            return Some(var.clone());
        }
        match self.backend.parse::<BackendKind>() {
            Ok(BackendKind::Qdrant) => Some("QDRANT_KEY".to_string()),
            Ok(BackendKind::Supabase) => Some("SUPABASE_KEY".to_string()),
            _ => None,
        }
    }

    fn connection_string_var(&self) -> String {
        self.connection_string_env
            .clone()
            .unwrap_or_else(|| "MONGO_URI".to_string())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub on_error: FailurePolicy,
}

/// Secrets looked up from the environment (or any other source).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Secrets {
    pub embedding_api_key: Option<String>,
    pub store_api_key: Option<String>,
    pub store_connection_string: Option<String>,
}

impl Config {
    /// Resolves every secret the configured provider and backend need.
    ///
    /// `lookup` maps a variable name to its value; the CLI passes
    /// `std::env::var`, tests pass a closure over a map.
    pub fn resolve_secrets(&self, lookup: impl Fn(&str) -> Option<String>) -> Secrets {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let store_connection_string = match self.store.backend.parse::<BackendKind>() {
            Ok(BackendKind::MongoDb) => non_empty(&self.store.connection_string_var()),
            _ => None,
        };
        Secrets {
            embedding_api_key: self.embedding.api_key_var().and_then(|v| non_empty(&v)),
            store_api_key: self.store.api_key_var().and_then(|v| non_empty(&v)),
            store_connection_string,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate dataset
    if config.dataset.text_column.trim().is_empty() {
        bail!("dataset.text_column must not be empty");
    }
    if config.dataset.list_column.trim().is_empty() {
        bail!("dataset.list_column must not be empty");
    }

    // Validate embedding
    if let Err(e) = config.embedding.provider.parse::<ProviderKind>() {
        bail!("{}", e);
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    // Validate store
    config.store.backend_kind()?;
    if config.store.dims == 0 {
        bail!("store.dims must be > 0");
    }
    if config.store.collection.trim().is_empty() {
        bail!("store.collection must not be empty");
    }
    if let Some(dims) = config.embedding.dims {
        if dims != config.store.dims {
            bail!(
                "embedding.dims ({}) does not match store.dims ({}); collections are fixed to one dimensionality",
                dims,
                config.store.dims
            );
        }
    }

    if config.retry.max_retries > 10 {
        bail!("retry.max_retries must be <= 10");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
[dataset]
text_column = "title"
list_column = "color_options"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.store.backend, "qdrant");
        assert_eq!(config.store.collection, "products");
        assert_eq!(config.store.dims, 1536);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.ingest.on_error, FailurePolicy::Continue);
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
[dataset]
text_column = "title"
list_column = "color_options"

[embedding]
provider = "gemini"
model = "gemini-embedding-001"
dims = 768

[store]
backend = "memory"
collection = "catalog"
dims = 768

[retry]
max_retries = 0

[ingest]
on_error = "abort"
"#,
        )
        .unwrap();
        assert_eq!(config.embedding.dims, Some(768));
        assert_eq!(config.store.backend_kind().unwrap(), BackendKind::Memory);
        assert_eq!(config.ingest.on_error, FailurePolicy::Abort);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let toml = format!("{}\n[embedding]\nprovider = \"bert\"\n", MINIMAL);
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("bert"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let toml = format!("{}\n[store]\nbackend = \"pinecone\"\n", MINIMAL);
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn test_dims_mismatch_rejected() {
        let toml = format!(
            "{}\n[embedding]\nprovider = \"openai\"\ndims = 384\n[store]\ndims = 1536\n",
            MINIMAL
        );
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_missing_dataset_section_rejected() {
        assert!(parse_config("[store]\nbackend = \"memory\"\n").is_err());
    }

    #[test]
    fn test_resolve_secrets_uses_default_variables() {
        let toml = format!(
            "{}\n[embedding]\nprovider = \"openai\"\n[store]\nbackend = \"qdrant\"\n",
            MINIMAL
        );
        let config = parse_config(&toml).unwrap();
        let env: HashMap<&str, &str> = [("OPENAI_API_KEY", "sk-test"), ("QDRANT_KEY", "qk")]
            .into_iter()
            .collect();
        let secrets = config.resolve_secrets(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(secrets.embedding_api_key.as_deref(), Some("sk-test"));
        assert_eq!(secrets.store_api_key.as_deref(), Some("qk"));
        assert_eq!(secrets.store_connection_string, None);
    }

    #[test]
    fn test_resolve_secrets_custom_variable_and_blank_values() {
        let toml = format!(
            "{}\n[embedding]\nprovider = \"gemini\"\napi_key_env = \"MY_KEY\"\n[store]\nbackend = \"mongodb\"\n",
            MINIMAL
        );
        let config = parse_config(&toml).unwrap();
        let env: HashMap<&str, &str> = [("MY_KEY", "  "), ("MONGO_URI", "mongodb://db:27017")]
            .into_iter()
            .collect();
        let secrets = config.resolve_secrets(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(secrets.embedding_api_key, None);
        assert_eq!(
            secrets.store_connection_string.as_deref(),
            Some("mongodb://db:27017")
        );
    }
}
