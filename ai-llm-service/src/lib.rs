//! Shared LLM access for the catalog chat backend.
//!
//! - [`service_profiles::LlmServiceProfiles`] owns the `rewrite`, `answer` and
//!   `embedding` profiles and caches one HTTP client per distinct config.
//! - [`services`] holds the provider clients (OpenAI-compatible and Ollama).
//! - [`health_service`] probes providers for the `/health` endpoint.
//! - [`telemetry`] builds the formatting layer installed by the binary.

pub mod chat_request;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use chat_request::ChatRequest;
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, Result};
pub use service_profiles::LlmServiceProfiles;
