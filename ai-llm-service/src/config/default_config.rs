//! Default LLM configs loaded from environment variables.
//!
//! Three roles are built from the same provider settings:
//!
//! - **Rewrite**   → turns a user question into a search phrase
//! - **Answer**    → composes the grounded catalog answer
//! - **Embedding** → embeds the rewritten phrase for vector search
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`         = `openai` (default) or `ollama`
//! - `LLM_TIMEOUT_SECS` = HTTP timeout per call (default 60)
//!
//! OpenAI-compatible:
//! - `LLM_ENDPOINT`                    = base URL (default `https://api.openai.com`)
//! - `LLM_API_KEY` or `OPENAI_API_KEY` = bearer key (mandatory)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//!
//! Models:
//! - `CHAT_MODEL`      = rewrite model (default `gpt-4o-mini`)
//! - `ANSWER_MODEL`    = answer model (defaults to `CHAT_MODEL`)
//! - `EMBEDDING_MODEL` = embedding model (default `text-embedding-ada-002`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_u64, must_env, validate_http_endpoint,
    },
};

const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Provider settings shared by every role.
struct ProviderEnv {
    provider: LlmProvider,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

fn provider_env() -> Result<ProviderEnv, AiLlmError> {
    let provider = match env_opt("LLM_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => LlmProvider::OpenAI,
    };
    let timeout_secs = env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(60);

    let (endpoint, api_key) = match provider {
        LlmProvider::Ollama => (ollama_endpoint()?, None),
        LlmProvider::OpenAI => {
            let endpoint =
                env_opt("LLM_ENDPOINT").unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());
            validate_http_endpoint("LLM_ENDPOINT", &endpoint)?;
            let key = env_opt("LLM_API_KEY")
                .or_else(|| env_opt("OPENAI_API_KEY"))
                .ok_or(ConfigError::MissingVar("LLM_API_KEY or OPENAI_API_KEY"))?;
            (endpoint, Some(key))
        }
    };

    Ok(ProviderEnv {
        provider,
        endpoint,
        api_key,
        timeout_secs,
    })
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
///
/// # Errors
///
/// - [`ConfigError::MissingVar`] if both are missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        let _ = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn model_or(var: &'static str, fallback: &str) -> String {
    env_opt(var).unwrap_or_else(|| fallback.to_string())
}

/// Constructs the **rewrite** profile.
///
/// Sampling defaults mirror the rewrite call: `temperature = 0.7`,
/// `max_tokens = 150`. Callers usually override both per request.
pub fn config_rewrite() -> Result<LlmModelConfig, AiLlmError> {
    let env = provider_env()?;
    Ok(LlmModelConfig {
        provider: env.provider,
        model: model_or("CHAT_MODEL", DEFAULT_CHAT_MODEL),
        endpoint: env.endpoint,
        api_key: env.api_key,
        max_tokens: Some(150),
        temperature: Some(0.7),
        top_p: None,
        timeout_secs: Some(env.timeout_secs),
    })
}

/// Constructs the **answer** profile.
///
/// # Env
/// - `ANSWER_MODEL` (optional, falls back to `CHAT_MODEL`)
///
/// # Defaults
/// - `temperature = Some(0.7)`
/// - `max_tokens = Some(300)`
pub fn config_answer() -> Result<LlmModelConfig, AiLlmError> {
    let env = provider_env()?;
    let chat_model = model_or("CHAT_MODEL", DEFAULT_CHAT_MODEL);
    Ok(LlmModelConfig {
        provider: env.provider,
        model: model_or("ANSWER_MODEL", &chat_model),
        endpoint: env.endpoint,
        api_key: env.api_key,
        max_tokens: Some(300),
        temperature: Some(0.7),
        top_p: None,
        timeout_secs: Some(env.timeout_secs),
    })
}

/// Constructs the **embedding** profile.
///
/// # Env
/// - `EMBEDDING_MODEL` (default `text-embedding-ada-002`; required for Ollama)
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let env = provider_env()?;
    let model = match env.provider {
        LlmProvider::OpenAI => model_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
        LlmProvider::Ollama => must_env("EMBEDDING_MODEL")?,
    };
    Ok(LlmModelConfig {
        provider: env.provider,
        model,
        endpoint: env.endpoint,
        api_key: env.api_key,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(env.timeout_secs.min(30)),
    })
}
