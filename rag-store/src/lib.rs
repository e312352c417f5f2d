//! Search Service facade for catalog retrieval.
//!
//! This crate provides a clean API to:
//! - Embed a search phrase through the shared LLM service
//! - Run a kNN query against Azure AI Search or Qdrant
//! - Map raw hits into [`ScoredPassage`] values
//!
//! The design is flat (no deep nesting) and splits responsibilities into focused modules.

mod azure_search;
mod config;
mod embed;
mod errors;
mod index;
mod qdrant_facade;
mod record;

pub use azure_search::AzureSearchIndex;
pub use config::{FieldMap, RagConfig, SearchBackend};
pub use embed::{EmbeddingsProvider, profile::ProfileEmbedder};
pub use errors::RagError;
pub use index::VectorIndex;
pub use qdrant_facade::QdrantFacade;
pub use record::ScoredPassage;

use std::{future::Future, pin::Pin, sync::Arc};

use tracing::{debug, trace};

/// The two remote calls the chat pipeline makes against the Search Service.
///
/// Kept as a trait so the pipeline can be driven by in-memory fakes.
pub trait SearchService: Send + Sync {
    /// Embeds a search phrase.
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;

    /// Returns up to `top_k` passages nearest to `vector`.
    fn knn<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, RagError>> + Send + 'a>>;
}

/// High-level facade that wires configuration, embedder and vector index.
///
/// This is the single entry point recommended for application code.
pub struct RagStore {
    cfg: RagConfig,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingsProvider>,
}

impl RagStore {
    /// Constructs a new store, selecting the backend from `cfg.backend`.
    ///
    /// # Errors
    /// Returns `RagError::Config` if the client initialization fails.
    pub fn new(cfg: RagConfig, embedder: Arc<dyn EmbeddingsProvider>) -> Result<Self, RagError> {
        trace!("RagStore::new backend={:?} index={}", cfg.backend, cfg.index);
        let index: Arc<dyn VectorIndex> = match cfg.backend {
            SearchBackend::Azure => Arc::new(AzureSearchIndex::new(&cfg)?),
            SearchBackend::Qdrant => Arc::new(QdrantFacade::new(&cfg)?),
        };
        Ok(Self {
            cfg,
            index,
            embedder,
        })
    }

    /// Assembles a store from pre-built parts.
    pub fn with_parts(
        cfg: RagConfig,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Self {
        Self {
            cfg,
            index,
            embedder,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Embeds `text` with the configured provider.
    ///
    /// # Errors
    /// Returns provider errors or `RagError::VectorSizeMismatch`.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let vector = self.embedder.embed(text).await?;
        debug!(dim = vector.len(), "embedded search phrase");
        Ok(vector)
    }

    /// Performs a vector search and returns passages in index order.
    ///
    /// # Errors
    /// Returns `RagError::AzureSearch` / `RagError::Qdrant` if search fails.
    pub async fn search_by_vector(
        &self,
        query_vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredPassage>, RagError> {
        trace!(
            "RagStore::search_by_vector backend={} top_k={top_k}",
            self.index.backend_name()
        );
        if let Some(want) = self.cfg.embedding_dim {
            if query_vector.len() != want {
                return Err(RagError::VectorSizeMismatch {
                    got: query_vector.len(),
                    want,
                });
            }
        }
        let hits = self.index.knn(query_vector, top_k).await?;
        debug!(hits = hits.len(), "vector search completed");
        Ok(hits)
    }
}

impl SearchService for RagStore {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(self.embed_text(text))
    }

    fn knn<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, RagError>> + Send + 'a>> {
        Box::pin(self.search_by_vector(vector, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedIndex(Vec<ScoredPassage>);

    impl VectorIndex for FixedIndex {
        fn knn<'a>(
            &'a self,
            _vector: Vec<f32>,
            top_k: u64,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, RagError>> + Send + 'a>>
        {
            let out = self.0.iter().take(top_k as usize).cloned().collect();
            Box::pin(async move { Ok(out) })
        }

        fn backend_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct ConstEmbedder(usize);

    impl EmbeddingsProvider for ConstEmbedder {
        fn embed<'a>(
            &'a self,
            _text: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
            let v = vec![0.5; self.0];
            Box::pin(async move { Ok(v) })
        }
    }

    fn store(dim: Option<usize>) -> RagStore {
        let mut cfg = RagConfig::new_default("https://demo.search.windows.net", "idx");
        cfg.embedding_dim = dim;
        let index = FixedIndex(vec![
            ScoredPassage::new("KitKat 4 finger", "p1", 0.9),
            ScoredPassage::new("KitKat Chunky", "p2", 0.8),
            ScoredPassage::new("Aero", "p3", 0.1),
        ]);
        RagStore::with_parts(cfg, Arc::new(index), Arc::new(ConstEmbedder(4)))
    }

    #[tokio::test]
    async fn search_truncates_to_top_k() {
        let s = store(None);
        let v = SearchService::embed(&s, "kitkat").await.unwrap();
        let hits = SearchService::knn(&s, v, 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "p1");
    }

    #[tokio::test]
    async fn search_rejects_wrong_dimension() {
        let s = store(Some(8));
        let err = s.search_by_vector(vec![0.0; 4], 3).await.unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 4, want: 8 }));
    }
}
