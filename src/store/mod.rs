//! Vector store backends and the factory that selects one.
//!
//! | Backend | Connection params | Status |
//! |---------|-------------------|--------|
//! | `qdrant` | url + optional API key | fully implemented (REST) |
//! | `memory` | none | fully implemented (in-process) |
//! | `chroma` | host + port | health check only |
//! | `mongodb` | connection string | health check only |
//! | `supabase` | url + API key | health check only |
//!
//! The partial backends answer every data operation with
//! [`StoreError::Unsupported`] so callers can tell "not supported" apart
//! from "nothing to do".

pub mod chroma;
pub mod mongodb;
pub mod qdrant;
pub mod supabase;

use std::time::Duration;

use catalog_vectors_core::error::StoreError;
use catalog_vectors_core::models::BackendKind;
use catalog_vectors_core::store::memory::InMemoryStore;
use catalog_vectors_core::store::{StoreOptions, VectorStore};

use crate::config::{Secrets, StoreConfig};

pub use chroma::ChromaStore;
pub use mongodb::MongoStore;
pub use qdrant::QdrantStore;
pub use supabase::SupabaseStore;

/// Backend-specific connection parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionParams {
    UrlKey {
        url: String,
        api_key: Option<String>,
    },
    HostPort {
        host: String,
        port: u16,
    },
    ConnectionString(String),
    InProcess,
}

impl ConnectionParams {
    /// Builds the parameter shape `config.backend` expects.
    pub fn from_config(config: &StoreConfig, secrets: &Secrets) -> Result<Self, StoreError> {
        let backend = parse_backend(&config.backend)?;
        let missing = |what: &str| StoreError::Connection {
            backend,
            message: format!("store.{} is required for the {} backend", what, backend),
            transient: false,
        };
        match backend {
            BackendKind::Qdrant | BackendKind::Supabase => Ok(ConnectionParams::UrlKey {
                url: config.url.clone().ok_or_else(|| missing("url"))?,
                api_key: secrets.store_api_key.clone(),
            }),
            BackendKind::Chroma => Ok(ConnectionParams::HostPort {
                host: config.host.clone().unwrap_or_else(|| "localhost".to_string()),
                port: config.port.unwrap_or(chroma::DEFAULT_PORT),
            }),
            BackendKind::MongoDb => secrets
                .store_connection_string
                .clone()
                .map(ConnectionParams::ConnectionString)
                .ok_or_else(|| missing("connection_string_env")),
            BackendKind::Memory => Ok(ConnectionParams::InProcess),
        }
    }
}

/// Connects to `backend` with `params`.
///
/// Fails with [`StoreError::Connection`] when the params do not fit the
/// backend or the backend is unreachable or rejects the credentials.
pub fn connect(
    backend: BackendKind,
    params: ConnectionParams,
    options: StoreOptions,
    timeout: Duration,
) -> Result<Box<dyn VectorStore>, StoreError> {
    match (backend, params) {
        (BackendKind::Qdrant, ConnectionParams::UrlKey { url, api_key }) => Ok(Box::new(
            QdrantStore::connect(&url, api_key.as_deref(), options, timeout)?,
        )),
        (BackendKind::Memory, ConnectionParams::InProcess) => {
            Ok(Box::new(InMemoryStore::new(options)))
        }
        (BackendKind::Chroma, ConnectionParams::HostPort { host, port }) => {
            Ok(Box::new(ChromaStore::connect(&host, port, timeout)?))
        }
        (BackendKind::MongoDb, ConnectionParams::ConnectionString(uri)) => {
            Ok(Box::new(MongoStore::connect(&uri)?))
        }
        (BackendKind::Supabase, ConnectionParams::UrlKey { url, api_key }) => {
            let api_key = api_key.ok_or_else(|| StoreError::Connection {
                backend,
                message: "supabase requires an API key".to_string(),
                transient: false,
            })?;
            Ok(Box::new(SupabaseStore::connect(&url, &api_key, timeout)?))
        }
        (backend, params) => Err(StoreError::Connection {
            backend,
            message: format!("connection params {:?} do not fit this backend", params.kind()),
            transient: false,
        }),
    }
}

/// Connects using the `[store]` section of the config.
pub fn connect_from_config(
    config: &StoreConfig,
    secrets: &Secrets,
) -> Result<Box<dyn VectorStore>, StoreError> {
    let params = ConnectionParams::from_config(config, secrets)?;
    connect(
        parse_backend(&config.backend)?,
        params,
        StoreOptions { dims: config.dims },
        Duration::from_secs(config.timeout_secs),
    )
}

/// Config validation rejects unknown names, so this only fails for
/// hand-built configs.
fn parse_backend(name: &str) -> Result<BackendKind, StoreError> {
    name.parse::<BackendKind>()
        .map_err(|message| StoreError::Connection {
            backend: BackendKind::Memory,
            message,
            transient: false,
        })
}

impl ConnectionParams {
    fn kind(&self) -> &'static str {
        match self {
            ConnectionParams::UrlKey { .. } => "url+key",
            ConnectionParams::HostPort { .. } => "host+port",
            ConnectionParams::ConnectionString(_) => "connection-string",
            ConnectionParams::InProcess => "in-process",
        }
    }
}
