//! Embedding provider backed by the shared LLM service's embedding profile.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::LlmServiceProfiles;
use tracing::warn;

use crate::{EmbeddingsProvider, RagError};

/// Embeds text through [`LlmServiceProfiles::embed`].
#[derive(Clone)]
pub struct ProfileEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected embedding dimension; `None` accepts any length.
    dim: Option<usize>,
}

impl ProfileEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for ProfileEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let vector = self.svc.embed(text).await?;
            check_dim(vector, self.dim)
        })
    }
}

fn check_dim(vector: Vec<f32>, want: Option<usize>) -> Result<Vec<f32>, RagError> {
    match want {
        Some(want) if vector.len() != want => {
            warn!(got = vector.len(), want, "embedding dimension mismatch");
            Err(RagError::VectorSizeMismatch {
                got: vector.len(),
                want,
            })
        }
        _ => Ok(vector),
    }
}
