//! Typed error for the contextor crate.

use std::fmt;

use thiserror::Error;

/// Pipeline stage that talks to an external service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Rewrite,
    Embedding,
    Search,
    Compose,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Rewrite => "rewrite",
            Stage::Embedding => "embedding",
            Stage::Search => "search",
            Stage::Compose => "compose",
        }
    }

    /// Message safe to show to an end user.
    pub fn public_message(self) -> &'static str {
        match self {
            Stage::Rewrite | Stage::Embedding => "Failed to generate embeddings",
            Stage::Search => "Failed to search documents",
            Stage::Compose => "Failed to generate response",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ContextorError {
    /// An external call (completion, embedding, search) failed or timed out.
    #[error("{stage} failed: {message}")]
    Upstream { stage: Stage, message: String },

    /// The answer model replied with something that is not the answer schema.
    #[error("answer schema error: {0}")]
    Schema(String),

    /// Invalid configuration at startup.
    #[error("config error: {0}")]
    Config(String),
}

impl ContextorError {
    pub fn upstream(stage: Stage, err: impl fmt::Display) -> Self {
        ContextorError::Upstream {
            stage,
            message: err.to_string(),
        }
    }

    /// Stage that failed, for upstream errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ContextorError::Upstream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
