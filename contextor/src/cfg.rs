//! Runtime configuration loaded from environment variables.

use std::{path::PathBuf, time::Duration};

use ai_llm_service::error_handler::validate_range_f32;

use crate::error::ContextorError;
use crate::intent::IntentVocabulary;
use crate::prompt::PromptSet;
use crate::rewrite::RewriteFallback;

/// Config bag for the pipeline. All fields have defaults via `from_env`.
#[derive(Clone, Debug)]
pub struct ContextorConfig {
    // Retrieval
    pub top_k: u64,

    // Context budget
    pub max_tokens: usize,
    pub reserved_margin: usize,
    pub tokenizer_model: String,

    pub vocabulary: IntentVocabulary,
    pub prompts: PromptSet,

    // Sampling
    pub rewrite_temperature: f32,
    pub rewrite_max_tokens: u32,
    pub answer_temperature: f32,
    pub answer_max_tokens: u32,
    pub rewrite_fallback: RewriteFallback,

    // Per-stage timeouts
    pub embed_timeout: Duration,
    pub search_timeout: Duration,
    pub completion_timeout: Duration,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_tokens: 600,
            reserved_margin: 250,
            tokenizer_model: "gpt-4o-mini".into(),
            vocabulary: IntentVocabulary::default(),
            prompts: PromptSet::default(),
            rewrite_temperature: 0.7,
            rewrite_max_tokens: 150,
            answer_temperature: 0.7,
            answer_max_tokens: 300,
            rewrite_fallback: RewriteFallback::RawQuery,
            embed_timeout: Duration::from_secs(20),
            search_timeout: Duration::from_secs(20),
            completion_timeout: Duration::from_secs(60),
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables with defaults.
    ///
    /// Vocabulary precedence: `INTENT_VOCAB_FILE` first, then the comma
    /// lists `INTENT_META_TERMS` / `INTENT_DOMAIN_TERMS` per list.
    ///
    /// # Errors
    /// `ContextorError::Config` for unparsable numbers or an unreadable vocabulary file.
    pub fn from_env() -> Result<Self, ContextorError> {
        let d = Self::default();

        let mut vocabulary = match env("INTENT_VOCAB_FILE") {
            Some(path) => IntentVocabulary::from_json_file(&PathBuf::from(path))?,
            None => d.vocabulary,
        };
        if let Some(raw) = env("INTENT_META_TERMS") {
            vocabulary.meta = IntentVocabulary::parse_list(&raw);
        }
        if let Some(raw) = env("INTENT_DOMAIN_TERMS") {
            vocabulary.domain = IntentVocabulary::parse_list(&raw);
        }

        let mut prompts = d.prompts;
        if let Some(greeting) = env("GREETING_MESSAGE") {
            prompts.greeting = greeting;
        }

        let rewrite_fallback = match env("REWRITE_FALLBACK") {
            Some(v) => v.parse()?,
            None => d.rewrite_fallback,
        };

        let cfg = Self {
            top_k: parse("RAG_TOP_K", d.top_k)?,
            max_tokens: parse("CTX_MAX_TOKENS", d.max_tokens)?,
            reserved_margin: parse("CTX_RESERVED_MARGIN", d.reserved_margin)?,
            tokenizer_model: env("TOKENIZER_MODEL").unwrap_or(d.tokenizer_model),
            vocabulary,
            prompts,
            rewrite_temperature: parse("REWRITE_TEMPERATURE", d.rewrite_temperature)?,
            rewrite_max_tokens: parse("REWRITE_MAX_TOKENS", d.rewrite_max_tokens)?,
            answer_temperature: parse("ANSWER_TEMPERATURE", d.answer_temperature)?,
            answer_max_tokens: parse("ANSWER_MAX_TOKENS", d.answer_max_tokens)?,
            rewrite_fallback,
            embed_timeout: secs("EMBED_TIMEOUT_SECS", d.embed_timeout)?,
            search_timeout: secs("SEARCH_TIMEOUT_SECS", d.search_timeout)?,
            completion_timeout: secs("COMPLETION_TIMEOUT_SECS", d.completion_timeout)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks values that parse but are not usable.
    ///
    /// # Errors
    /// `ContextorError::Config` for a zero `top_k` or a sampling temperature
    /// outside `0.0..=2.0`.
    pub fn validate(&self) -> Result<(), ContextorError> {
        if self.top_k == 0 {
            return Err(ContextorError::Config("RAG_TOP_K must be > 0".into()));
        }
        for (field, value) in [
            ("REWRITE_TEMPERATURE", self.rewrite_temperature),
            ("ANSWER_TEMPERATURE", self.answer_temperature),
        ] {
            validate_range_f32(field, value, 0.0, 2.0)
                .map_err(|e| ContextorError::Config(e.to_string()))?;
        }
        Ok(())
    }
}

fn env(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> Result<T, ContextorError> {
    match env(k) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ContextorError::Config(format!("{k}: invalid number `{v}`"))),
        None => Ok(dflt),
    }
}

fn secs(k: &str, dflt: Duration) -> Result<Duration, ContextorError> {
    let s: u64 = parse(k, dflt.as_secs())?;
    if s == 0 {
        return Err(ContextorError::Config(format!("{k} must be > 0")));
    }
    Ok(Duration::from_secs(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let c = ContextorConfig::default();
        assert_eq!(c.top_k, 3);
        assert_eq!((c.max_tokens, c.reserved_margin), (600, 250));
        assert_eq!((c.rewrite_max_tokens, c.answer_max_tokens), (150, 300));
        assert_eq!(c.rewrite_fallback, RewriteFallback::RawQuery);
    }

    #[test]
    fn temperature_outside_sampling_range_is_rejected() {
        assert!(ContextorConfig::default().validate().is_ok());

        let hot = ContextorConfig { answer_temperature: 3.0, ..ContextorConfig::default() };
        let err = hot.validate().unwrap_err();
        assert!(matches!(err, ContextorError::Config(_)));
        assert!(err.to_string().contains("ANSWER_TEMPERATURE"));

        let nan = ContextorConfig { rewrite_temperature: f32::NAN, ..ContextorConfig::default() };
        assert!(nan.validate().unwrap_err().to_string().contains("REWRITE_TEMPERATURE"));

        let zero_k = ContextorConfig { top_k: 0, ..ContextorConfig::default() };
        assert!(zero_k.validate().is_err());
    }
}
