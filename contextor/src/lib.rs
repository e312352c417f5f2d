//! Query-to-answer pipeline for catalog chat.
//!
//! Public API: [`ChatPipeline::answer`]. It gates the query with the
//! [`IntentClassifier`], rewrites and embeds it, runs a kNN search,
//! packs the hits into a token budget and asks the completion model for a
//! structured [`Answer`] grounded in that context.

pub mod budget;
mod cfg;
pub mod compose;
mod error;
pub mod intent;
mod llm;
mod pipeline;
pub mod prompt;
pub mod rewrite;
pub mod search;
pub mod tokens;

pub use budget::{ComposedContext, ContextBudget, UsedSource};
pub use cfg::ContextorConfig;
pub use compose::{Answer, AnswerComposer, ProductDetail};
pub use error::{ContextorError, Stage};
pub use intent::{IntentClassifier, IntentVocabulary};
pub use llm::{CompletionKind, CompletionService};
pub use pipeline::{ChatPipeline, ChatReply, ReplyBody};
pub use prompt::PromptSet;
pub use rewrite::{QueryRewriter, RewriteFallback};
pub use search::SearchGateway;
pub use tokens::TokenCounter;

/// Query prefix for log fields.
pub(crate) fn short(query: &str) -> String {
    const MAX: usize = 80;
    if query.chars().count() <= MAX {
        return query.to_string();
    }
    let mut s: String = query.chars().take(MAX).collect();
    s.push('…');
    s
}
