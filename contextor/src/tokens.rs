//! Token Counter: exact BPE counts via `tiktoken-rs`, word heuristic otherwise.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Estimates the token cost of text for one completion model.
///
/// Counting never fails: when the model has no known tokenizer the counter
/// uses `floor(words * 1.3)` for every call.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenCounter {
    /// Loads the tokenizer for `model` (e.g. `gpt-4o-mini`).
    pub fn for_model(model: &str) -> Self {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Self {
                bpe: Some(Arc::new(bpe)),
            },
            Err(e) => {
                warn!(model, error = %e, "tokenizer unavailable, using approximate token count");
                Self::approximate()
            }
        }
    }

    /// Counter that always uses the word-count approximation.
    pub fn approximate() -> Self {
        Self { bpe: None }
    }

    pub fn is_exact(&self) -> bool {
        self.bpe.is_some()
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => approximate_count(text),
        }
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("exact", &self.is_exact())
            .finish()
    }
}

/// `floor(whitespace_words * 1.3)`.
pub fn approximate_count(text: &str) -> usize {
    text.split_whitespace().count() * 13 / 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approximation_floors() {
        assert_eq!(approximate_count(""), 0);
        assert_eq!(approximate_count("one"), 1);
        assert_eq!(approximate_count("a b c d e"), 6);
        assert_eq!(approximate_count("  spaced\n\tout  words "), 3);
        assert_eq!(approximate_count("w ".repeat(10).as_str()), 13);
    }

    #[test]
    fn unknown_model_falls_back() {
        let c = TokenCounter::for_model("definitely-not-a-model");
        assert!(!c.is_exact());
        assert_eq!(c.count("how many calories"), 3);
    }

    #[test]
    fn exact_counter_counts_tokens() {
        let c = TokenCounter::for_model("gpt-4o-mini");
        assert!(c.is_exact());
        assert_eq!(c.count(""), 0);
        let n = c.count("hello world");
        assert!(n > 0 && n < 10, "got {n}");
    }
}
