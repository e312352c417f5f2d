//! Chat Orchestrator.
//!
//! `Received -> Classified -> (ShortCircuit | Embedding -> Searching ->
//! Budgeting -> Composing) -> Responded`. Stages run strictly in sequence;
//! the first failing stage ends the request with its error.

use std::{sync::Arc, time::Instant};

use rag_store::SearchService;
use serde::Serialize;
use tracing::{debug, info};

use crate::budget::{self, ContextBudget, UsedSource};
use crate::cfg::ContextorConfig;
use crate::compose::{Answer, AnswerComposer, ComposeSettings};
use crate::error::ContextorError;
use crate::intent::IntentClassifier;
use crate::llm::CompletionService;
use crate::rewrite::{QueryRewriter, RewriteSettings};
use crate::search::SearchGateway;
use crate::short;
use crate::tokens::TokenCounter;

/// Response body of one chat turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatReply {
    pub answer: ReplyBody,
    pub sources: Vec<UsedSource>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyBody {
    /// Fixed greeting for queries that skip retrieval.
    Canned(String),
    Structured(Answer),
}

/// Long-lived pipeline; one instance serves all requests concurrently.
pub struct ChatPipeline {
    classifier: IntentClassifier,
    rewriter: QueryRewriter,
    gateway: SearchGateway,
    composer: AnswerComposer,
    counter: TokenCounter,
    budget: ContextBudget,
    greeting: String,
}

impl ChatPipeline {
    /// Builds the pipeline with the tokenizer named in `cfg`.
    pub fn new(
        cfg: ContextorConfig,
        completion: Arc<dyn CompletionService>,
        search: Arc<dyn SearchService>,
    ) -> Self {
        let counter = TokenCounter::for_model(&cfg.tokenizer_model);
        Self::with_counter(cfg, counter, completion, search)
    }

    /// Builds the pipeline with an explicit token counter.
    ///
    /// The reserved part of the budget is computed here, once, from the
    /// preamble the composer will send.
    pub fn with_counter(
        cfg: ContextorConfig,
        counter: TokenCounter,
        completion: Arc<dyn CompletionService>,
        search: Arc<dyn SearchService>,
    ) -> Self {
        let budget = ContextBudget::for_preamble(
            cfg.max_tokens,
            &cfg.prompts.preamble,
            cfg.reserved_margin,
            &counter,
        );
        info!(
            max_tokens = budget.max_tokens,
            reserved = budget.reserved_tokens,
            available = budget.available(),
            exact_tokenizer = counter.is_exact(),
            "context budget ready"
        );

        let rewriter = QueryRewriter::new(
            completion.clone(),
            search.clone(),
            cfg.prompts.rewrite_system.clone(),
            RewriteSettings {
                temperature: cfg.rewrite_temperature,
                max_tokens: cfg.rewrite_max_tokens,
                fallback: cfg.rewrite_fallback,
                completion_timeout: cfg.completion_timeout,
                embed_timeout: cfg.embed_timeout,
            },
        );
        let gateway = SearchGateway::new(search, cfg.top_k, cfg.search_timeout);
        let composer = AnswerComposer::new(
            completion,
            cfg.prompts.answer_system(),
            ComposeSettings {
                temperature: cfg.answer_temperature,
                max_tokens: cfg.answer_max_tokens,
                timeout: cfg.completion_timeout,
            },
        );

        Self {
            classifier: IntentClassifier::new(&cfg.vocabulary),
            rewriter,
            gateway,
            composer,
            counter,
            budget,
            greeting: cfg.prompts.greeting,
        }
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    /// Answers one query.
    ///
    /// # Errors
    /// The first failing stage's [`ContextorError`]; no partial answer.
    pub async fn answer(&self, query: &str) -> Result<ChatReply, ContextorError> {
        let started = Instant::now();

        if !self.classifier.classify(query) {
            info!(query = %short(query), "short-circuit: no retrieval needed");
            return Ok(ChatReply {
                answer: ReplyBody::Canned(self.greeting.clone()),
                sources: Vec::new(),
            });
        }
        debug!(query = %short(query), "query needs catalog context");

        let vector = self.rewriter.embed(query).await?;
        let passages = self.gateway.search(query, vector).await?;

        let ctx = budget::build(&passages, self.budget, &self.counter);
        info!(
            stage = "budget",
            hits = passages.len(),
            used = ctx.used().len(),
            "context budgeted"
        );
        let (context, sources) = ctx.into_parts();

        let answer = self.composer.compose(query, &context).await?;
        info!(
            query = %short(query),
            sources = sources.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "chat answered"
        );

        Ok(ChatReply {
            answer: ReplyBody::Structured(answer),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_reply_serializes_as_plain_string() {
        let r = ChatReply {
            answer: ReplyBody::Canned("Hello!".into()),
            sources: vec![],
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({"answer": "Hello!", "sources": []})
        );
    }
}
