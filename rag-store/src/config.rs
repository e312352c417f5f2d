//! Runtime configuration of the search backend.

use std::str::FromStr;

use crate::errors::RagError;

/// Vector index implementation behind the Search Service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchBackend {
    /// Azure AI Search over its REST API.
    Azure,
    /// Qdrant over gRPC.
    Qdrant,
}

impl FromStr for SearchBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" | "azure-search" => Ok(Self::Azure),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(RagError::Config(format!("unsupported SEARCH_BACKEND `{other}`"))),
        }
    }
}

/// Names of the index fields the passage mapping reads.
#[derive(Clone, Debug)]
pub struct FieldMap {
    /// Vector field searched by kNN.
    pub vector: String,
    /// Passage body.
    pub content: String,
    /// Parent document / identity of the passage.
    pub source: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            vector: "text_vector".into(),
            content: "chunk".into(),
            source: "parent_id".into(),
        }
    }
}

/// Configuration for retrieval against the catalog index.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub backend: SearchBackend,
    /// Service endpoint, e.g. `https://<name>.search.windows.net` or `http://localhost:6334`.
    pub endpoint: String,
    /// API key (Azure `api-key` header, Qdrant Cloud key).
    pub api_key: Option<String>,
    /// Index (Azure) or collection (Qdrant) name.
    pub index: String,
    pub fields: FieldMap,
    /// Azure REST API version.
    pub api_version: String,
    /// Expected embedding dimension; `None` disables the check.
    pub embedding_dim: Option<usize>,
    /// Exact search flag for Qdrant (false = HNSW ANN).
    pub exact_search: bool,
    /// HTTP timeout for a single search call.
    pub timeout_secs: u64,
}

impl RagConfig {
    /// Creates a default Azure config for a given endpoint and index name.
    pub fn new_default(endpoint: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            backend: SearchBackend::Azure,
            endpoint: endpoint.into(),
            api_key: None,
            index: index.into(),
            fields: FieldMap::default(),
            api_version: "2023-11-01".into(),
            embedding_dim: None,
            exact_search: false,
            timeout_secs: 20,
        }
    }

    /// Loads the config from environment variables.
    ///
    /// `SEARCH_ENDPOINT` is required; everything else has a default.
    ///
    /// # Errors
    /// Returns `RagError::Config` for missing endpoint or unparsable values.
    pub fn from_env() -> Result<Self, RagError> {
        let backend = match env("SEARCH_BACKEND") {
            Some(v) => v.parse()?,
            None => SearchBackend::Azure,
        };
        let endpoint = env("SEARCH_ENDPOINT")
            .or_else(|| (backend == SearchBackend::Qdrant).then(|| env("QDRANT_URL")).flatten())
            .ok_or_else(|| RagError::Config("SEARCH_ENDPOINT is not set".into()))?;

        let mut defaults = FieldMap::default();
        if backend == SearchBackend::Qdrant {
            // Qdrant collections usually carry a single unnamed vector.
            defaults.vector = String::new();
        }
        let cfg = Self {
            backend,
            endpoint,
            api_key: env("SEARCH_API_KEY").or_else(|| env("QDRANT_API_KEY")),
            index: env("SEARCH_INDEX").unwrap_or_else(|| "product-vector-index".into()),
            fields: FieldMap {
                vector: env("SEARCH_VECTOR_FIELD").unwrap_or(defaults.vector),
                content: env("SEARCH_CONTENT_FIELD").unwrap_or(defaults.content),
                source: env("SEARCH_SOURCE_FIELD").unwrap_or(defaults.source),
            },
            api_version: env("SEARCH_API_VERSION").unwrap_or_else(|| "2023-11-01".into()),
            embedding_dim: parse_opt("EMBEDDING_DIM")?,
            exact_search: env("RAG_EXACT_SEARCH").as_deref() == Some("true"),
            timeout_secs: parse_opt("SEARCH_TIMEOUT_SECS")?.unwrap_or(20),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        let ep = self.endpoint.trim();
        if !(ep.starts_with("http://") || ep.starts_with("https://")) {
            return Err(RagError::Config(
                "endpoint must start with http:// or https://".into(),
            ));
        }
        if self.index.trim().is_empty() {
            return Err(RagError::Config("index is empty".into()));
        }
        if self.backend == SearchBackend::Azure && self.api_key.is_none() {
            return Err(RagError::Config("SEARCH_API_KEY is required for azure".into()));
        }
        if self.timeout_secs == 0 {
            return Err(RagError::Config("timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

fn env(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.trim().is_empty())
}

fn parse_opt<T: FromStr>(k: &str) -> Result<Option<T>, RagError> {
    match env(k) {
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RagError::Config(format!("{k} is not a valid number"))),
        None => Ok(None),
    }
}
