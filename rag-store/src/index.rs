use std::{future::Future, pin::Pin};

use crate::errors::RagError;
use crate::record::ScoredPassage;

/// Nearest-neighbour lookup over the catalog index.
///
/// Implementations return at most `top_k` passages in the backend's
/// relevance order. Scores are passed through unchanged.
pub trait VectorIndex: Send + Sync {
    fn knn<'a>(
        &'a self,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, RagError>> + Send + 'a>>;

    /// Short backend label used in logs.
    fn backend_name(&self) -> &'static str;
}
