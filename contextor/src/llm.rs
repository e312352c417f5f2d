//! Completion Service seam over the shared LLM profiles.

use std::{future::Future, pin::Pin};

use ai_llm_service::{AiLlmError, ChatRequest, LlmServiceProfiles};

/// Which profile a completion runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    Rewrite,
    Answer,
}

/// Chat-style completion returning the assistant's text.
///
/// Implemented by [`LlmServiceProfiles`]; tests plug in fakes.
pub trait CompletionService: Send + Sync {
    fn complete<'a>(
        &'a self,
        kind: CompletionKind,
        req: ChatRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>>;
}

impl CompletionService for LlmServiceProfiles {
    fn complete<'a>(
        &'a self,
        kind: CompletionKind,
        req: ChatRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>> {
        Box::pin(async move {
            match kind {
                CompletionKind::Rewrite => self.chat_rewrite(&req).await,
                CompletionKind::Answer => self.chat_answer(&req).await,
            }
        })
    }
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````).
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let t = raw.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
