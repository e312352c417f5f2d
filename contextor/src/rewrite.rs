//! Query Rewriter/Embedder: question -> search phrase -> vector.

use std::{str::FromStr, sync::Arc, time::Duration, time::Instant};

use ai_llm_service::ChatRequest;
use rag_store::SearchService;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{ContextorError, Stage};
use crate::llm::{CompletionKind, CompletionService, strip_code_fence};
use crate::short;

/// What to do when the rewrite call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RewriteFallback {
    /// Embed the raw query instead.
    #[default]
    RawQuery,
    /// Fail the request.
    Fail,
}

impl FromStr for RewriteFallback {
    type Err = ContextorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "raw_query" => Ok(Self::RawQuery),
            "fail" => Ok(Self::Fail),
            other => Err(ContextorError::Config(format!(
                "REWRITE_FALLBACK must be `raw` or `fail`, got `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RewriteSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub fallback: RewriteFallback,
    pub completion_timeout: Duration,
    pub embed_timeout: Duration,
}

pub struct QueryRewriter {
    completion: Arc<dyn CompletionService>,
    search: Arc<dyn SearchService>,
    system: String,
    settings: RewriteSettings,
}

#[derive(Deserialize)]
struct RewriteReply {
    search_query: String,
}

impl QueryRewriter {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        search: Arc<dyn SearchService>,
        system: impl Into<String>,
        settings: RewriteSettings,
    ) -> Self {
        Self {
            completion,
            search,
            system: system.into(),
            settings,
        }
    }

    /// Rewrites `query` into a search phrase and embeds the phrase.
    ///
    /// # Errors
    /// `Upstream { stage: Rewrite }` when rewriting fails and the fallback is
    /// [`RewriteFallback::Fail`]; `Upstream { stage: Embedding }` when the
    /// embedding call fails.
    pub async fn embed(&self, query: &str) -> Result<Vec<f32>, ContextorError> {
        let phrase = match self.rewrite(query).await {
            Ok(p) => p,
            Err(e) if self.settings.fallback == RewriteFallback::RawQuery => {
                warn!(stage = "rewrite", query = %short(query), error = %e, "rewrite failed, embedding raw query");
                query.to_string()
            }
            Err(e) => {
                error!(stage = "rewrite", query = %short(query), error = %e, "rewrite failed");
                return Err(e);
            }
        };

        let started = Instant::now();
        let vector = match timeout(self.settings.embed_timeout, self.search.embed(&phrase)).await {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                error!(stage = "embedding", query = %short(query), error = %e, "embedding failed");
                return Err(ContextorError::upstream(Stage::Embedding, e));
            }
            Err(_) => {
                error!(stage = "embedding", query = %short(query), "embedding timed out");
                return Err(timed_out(Stage::Embedding, self.settings.embed_timeout));
            }
        };
        info!(
            stage = "embedding",
            dim = vector.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "query embedded"
        );
        Ok(vector)
    }

    /// Asks the completion model for one search phrase.
    pub async fn rewrite(&self, query: &str) -> Result<String, ContextorError> {
        let req = ChatRequest::new(query)
            .with_system(&self.system)
            .with_sampling(self.settings.temperature, self.settings.max_tokens)
            .json();

        let started = Instant::now();
        let raw = match timeout(
            self.settings.completion_timeout,
            self.completion.complete(CompletionKind::Rewrite, req),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(ContextorError::upstream(Stage::Rewrite, e)),
            Err(_) => return Err(timed_out(Stage::Rewrite, self.settings.completion_timeout)),
        };

        let phrase = parse_search_phrase(&raw)
            .ok_or_else(|| ContextorError::upstream(Stage::Rewrite, "empty search phrase"))?;
        debug!(phrase = %short(&phrase), "rewritten search phrase");
        info!(
            stage = "rewrite",
            latency_ms = started.elapsed().as_millis() as u64,
            "query rewritten"
        );
        Ok(phrase)
    }
}

/// `{"search_query": ...}` wins; non-JSON text is used as-is if non-empty.
fn parse_search_phrase(raw: &str) -> Option<String> {
    let body = strip_code_fence(raw);
    let phrase = match serde_json::from_str::<RewriteReply>(body) {
        Ok(r) => r.search_query,
        Err(_) if body.starts_with('{') => return None,
        Err(_) => body.to_string(),
    };
    let phrase = phrase.trim();
    (!phrase.is_empty()).then(|| phrase.to_string())
}

pub(crate) fn timed_out(stage: Stage, after: Duration) -> ContextorError {
    ContextorError::upstream(stage, format!("timed out after {}s", after.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_reply_is_preferred() {
        assert_eq!(
            parse_search_phrase(r#"{"search_query": "KitKat calories per bar"}"#).as_deref(),
            Some("KitKat calories per bar")
        );
        assert_eq!(
            parse_search_phrase("```json\n{\"search_query\": \"Nesquik\"}\n```").as_deref(),
            Some("Nesquik")
        );
    }

    #[test]
    fn plain_text_reply_is_used_when_non_empty() {
        assert_eq!(
            parse_search_phrase("  KitKat nutrition facts ").as_deref(),
            Some("KitKat nutrition facts")
        );
        assert_eq!(parse_search_phrase("   "), None);
    }

    #[test]
    fn unusable_json_is_rejected() {
        assert_eq!(parse_search_phrase(r#"{"search_query": "  "}"#), None);
        assert_eq!(parse_search_phrase(r#"{"query": "x"}"#), None);
    }

    #[test]
    fn fallback_parses() {
        assert_eq!("raw".parse::<RewriteFallback>().unwrap(), RewriteFallback::RawQuery);
        assert_eq!("FAIL".parse::<RewriteFallback>().unwrap(), RewriteFallback::Fail);
        assert!("retry".parse::<RewriteFallback>().is_err());
    }
}
