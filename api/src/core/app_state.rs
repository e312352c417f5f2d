use std::sync::Arc;

use ai_llm_service::{
    LlmServiceProfiles,
    config::default_config::{config_answer, config_embedding, config_rewrite},
};
use contextor::{ChatPipeline, ContextorConfig};
use rag_store::{ProfileEmbedder, RagConfig, RagStore};
use tracing::info;

use crate::error_handler::AppError;

/// Shared state for all HTTP handlers.
///
/// Built once at startup; handlers only read it.
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    /// LLM profiles probed by `/health`; `None` skips provider checks.
    pub llm: Option<Arc<LlmServiceProfiles>>,
}

impl AppState {
    pub fn new(pipeline: Arc<ChatPipeline>, llm: Option<Arc<LlmServiceProfiles>>) -> Self {
        Self { pipeline, llm }
    }

    /// Wires LLM profiles, the search store and the pipeline from env.
    pub fn from_env() -> Result<Self, AppError> {
        let llm = Arc::new(LlmServiceProfiles::new(
            config_rewrite()?,
            Some(config_answer()?),
            config_embedding()?,
            None,
        )?);

        let rag_cfg = RagConfig::from_env()?;
        info!(
            backend = ?rag_cfg.backend,
            index = %rag_cfg.index,
            "search service configured"
        );
        let embedder = Arc::new(ProfileEmbedder::new(llm.clone(), rag_cfg.embedding_dim));
        let store = RagStore::new(rag_cfg, embedder)?;

        let cfg = ContextorConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let pipeline = ChatPipeline::new(cfg, llm.clone(), Arc::new(store));

        Ok(Self::new(Arc::new(pipeline), Some(llm)))
    }
}
