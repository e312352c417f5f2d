//! Shared LLM service with three profiles: `rewrite`, `answer`, and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - If the `answer` profile is not provided, it falls back to `rewrite`.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{ChatRequest, LlmServiceProfiles};
//! use ai_llm_service::config::default_config::{config_embedding, config_rewrite};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = Arc::new(LlmServiceProfiles::new(
//!     config_rewrite()?,
//!     None,
//!     config_embedding()?,
//!     Some(10),
//! )?);
//!
//! let phrase = svc.chat_rewrite(&ChatRequest::new("does Nestlé sell KitKat?")).await?;
//! let emb = svc.embed(&phrase).await?;
//! println!("Embedding dim = {}", emb.len());
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    chat_request::ChatRequest,
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Shared service that manages the **rewrite**, **answer** and **embedding** profiles.
///
/// Internally, it caches Ollama/OpenAI clients keyed by their configuration to
/// avoid recreating HTTP clients on each call.
pub struct LlmServiceProfiles {
    rewrite: LlmModelConfig,
    answer: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service with three profiles.
    ///
    /// - `rewrite`: required query-rewrite profile.
    /// - `answer_opt`: optional answer profile. If `None`, falls back to `rewrite`.
    /// - `embedding`: required embedding profile.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    pub fn new(
        rewrite: LlmModelConfig,
        answer_opt: Option<LlmModelConfig>,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let answer = answer_opt.unwrap_or_else(|| rewrite.clone());

        Ok(Self {
            rewrite,
            answer,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Runs a chat completion with the **rewrite** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the provider call fails.
    pub async fn chat_rewrite(&self, req: &ChatRequest<'_>) -> Result<String, AiLlmError> {
        self.chat_with(&self.rewrite, req).await
    }

    /// Runs a chat completion with the **answer** profile.
    pub async fn chat_answer(&self, req: &ChatRequest<'_>) -> Result<String, AiLlmError> {
        self.chat_with(&self.answer, req).await
    }

    /// Computes embeddings using the **embedding** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if embedding fails.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match self.embedding.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(&self.embedding).await?;
                cli.embeddings(input).await
            }
            LlmProvider::OpenAI => {
                let cli = self.get_or_init_openai(&self.embedding).await?;
                cli.embeddings(input).await
            }
        }
    }

    /// Returns a health snapshot for all distinct profiles.
    ///
    /// Profiles sharing the same config are checked only once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::<LlmModelConfig>::with_capacity(3);
        for cfg in [&self.rewrite, &self.answer, &self.embedding] {
            if !list.contains(cfg) {
                list.push(cfg.clone());
            }
        }
        self.health.check_many(&list).await
    }

    /// Returns references to the current profiles `(rewrite, answer, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig, &LlmModelConfig) {
        (&self.rewrite, &self.answer, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn chat_with(
        &self,
        cfg: &LlmModelConfig,
        req: &ChatRequest<'_>,
    ) -> Result<String, AiLlmError> {
        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(cfg).await?;
                cli.chat(req).await
            }
            LlmProvider::OpenAI => {
                let cli = self.get_or_init_openai(cfg).await?;
                cli.chat(req).await
            }
        }
    }

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Internal cache key to identify unique client configs.
///
/// Sampling parameters are excluded: they travel with each request, so
/// profiles that differ only in sampling share one HTTP client.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai(model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: model.into(),
            endpoint: "https://api.openai.com".into(),
            api_key: Some("sk-test".into()),
            max_tokens: None,
            temperature: Some(0.7),
            top_p: None,
            timeout_secs: Some(10),
        }
    }

    #[test]
    fn answer_falls_back_to_rewrite() {
        let svc =
            LlmServiceProfiles::new(openai("gpt-4o-mini"), None, openai("ada"), None).unwrap();
        let (rewrite, answer, embedding) = svc.profiles();
        assert_eq!(rewrite, answer);
        assert_eq!(embedding.model, "ada");
    }

    #[test]
    fn client_key_ignores_sampling() {
        let a = openai("gpt-4o-mini");
        let mut b = a.clone();
        b.temperature = Some(0.0);
        b.max_tokens = Some(300);
        assert!(ClientKey::from(&a) == ClientKey::from(&b));
    }

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let svc =
            LlmServiceProfiles::new(openai("gpt-4o-mini"), None, openai("ada"), None).unwrap();
        let first = svc.get_or_init_openai(&openai("gpt-4o-mini")).await.unwrap();
        let second = svc.get_or_init_openai(&openai("gpt-4o-mini")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(svc.openai.read().await.len(), 1);
    }
}
