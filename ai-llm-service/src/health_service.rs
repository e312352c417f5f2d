//! Provider health probes backing the `/health` endpoint.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model looked up by `name`
//! - OpenAI: `GET {endpoint}/v1/models` with bearer auth, model looked up by `id`
//!
//! [`HealthService::check`] never fails: every problem becomes `ok = false`
//! with a short message. The strict probe underneath returns `Result`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend/provider (e.g., "Ollama", "OpenAI").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model the profile is configured with.
    pub model: String,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the probe.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Listing of models exposed by a provider, in either dialect.
#[derive(Debug, Default, Deserialize)]
struct ModelListing {
    /// Ollama: `{ "models": [ { "name": ... } ] }`
    #[serde(default)]
    models: Vec<NamedModel>,
    /// OpenAI: `{ "data": [ { "id": ... } ] }`
    #[serde(default)]
    data: Vec<NamedModel>,
}

#[derive(Debug, Deserialize)]
struct NamedModel {
    #[serde(alias = "id")]
    name: String,
}

impl ModelListing {
    fn contains(&self, model: &str) -> bool {
        self.models
            .iter()
            .chain(self.data.iter())
            .any(|m| m.name == model)
    }
}

/// A health checker that reuses a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks health for a single config. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let start = Instant::now();
        let status = match self.probe(cfg).await {
            Ok(listing) if listing.contains(&cfg.model) => HealthStatus::new(
                cfg,
                true,
                start.elapsed().as_millis(),
                "provider is healthy; model is available",
            ),
            Ok(_) => HealthStatus::new(
                cfg,
                false,
                start.elapsed().as_millis(),
                "provider is up, but model is not listed",
            ),
            Err(err) => HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string()),
        };

        if status.ok {
            info!(
                provider = %status.provider,
                model = %status.model,
                latency_ms = status.latency_ms,
                "health probe completed"
            );
        } else {
            warn!(
                provider = %status.provider,
                endpoint = %status.endpoint,
                model = %status.model,
                message = %status.message,
                "health probe failed"
            );
        }
        status
    }

    /// Checks health for multiple configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running batch health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn probe(&self, cfg: &LlmModelConfig) -> Result<ModelListing, AiLlmError> {
        let base = cfg.endpoint.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(HealthError::InvalidEndpoint(cfg.endpoint.clone()).into());
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .min(self.default_timeout);

        let (url, request) = match cfg.provider {
            LlmProvider::Ollama => {
                let url = format!("{base}/api/tags");
                let req = self.client.get(&url);
                (url, req)
            }
            LlmProvider::OpenAI => {
                let url = format!("{base}/v1/models");
                let key = cfg
                    .api_key
                    .as_deref()
                    .ok_or_else(|| HealthError::Decode("missing API key".into()))?;
                let req = self
                    .client
                    .get(&url)
                    .header(header::AUTHORIZATION, format!("Bearer {key}"));
                (url, req)
            }
        };

        debug!(provider = ?cfg.provider, model = %cfg.model, "GET {}", url);
        let resp = request.timeout(timeout).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet: make_snippet(&text),
            })
            .into());
        }

        resp.json::<ModelListing>()
            .await
            .map_err(|e| HealthError::Decode(format!("model listing: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_understands_both_dialects() {
        let ollama: ModelListing =
            serde_json::from_str(r#"{"models":[{"name":"qwen3:14b"}]}"#).unwrap();
        assert!(ollama.contains("qwen3:14b"));

        let openai: ModelListing =
            serde_json::from_str(r#"{"object":"list","data":[{"id":"gpt-4o-mini"}]}"#).unwrap();
        assert!(openai.contains("gpt-4o-mini"));
        assert!(!openai.contains("gpt-4o"));
    }

    #[tokio::test]
    async fn invalid_endpoint_reports_unhealthy() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "m".into(),
            endpoint: "localhost:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        };
        let status = svc.check(&cfg).await;
        assert!(!status.ok);
        assert!(status.message.contains("invalid endpoint"));
    }
}
