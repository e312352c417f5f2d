//! Intent Classifier: decides whether a query needs catalog grounding.
//!
//! Two ordered term lists drive the gate. A query mentioning any
//! meta-conversation term (greetings, questions about the assistant) is
//! answered with the canned greeting even if it also names a product.
//! Otherwise it needs retrieval iff it mentions a domain term.
//!
//! Terms match whole words: `"hi"` matches `"hi there"` but not `"which"`,
//! and multi-word terms (`"where can i"`) match as a contiguous phrase.

use std::path::Path;

use serde::Deserialize;

use crate::error::ContextorError;

/// Built-in meta-conversation vocabulary.
pub const DEFAULT_META_TERMS: &[&str] = &[
    "you", "your", "chatbot", "bot", "ai", "assistant", "help", "hello", "hi", "hey",
    "greetings", "what can", "how do", "who are", "what are",
];

/// Built-in catalog vocabulary.
pub const DEFAULT_DOMAIN_TERMS: &[&str] = &[
    "nestle", "nestlé", "product", "products", "recipe", "recipes", "food", "chocolate",
    "candy", "ingredients", "nutrition", "where can i", "how much", "how many", "what is",
    "when", "calorie", "calories", "sugar", "allergen", "allergens", "kitkat", "buy",
];

/// The two term lists, as loaded from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IntentVocabulary {
    pub meta: Vec<String>,
    pub domain: Vec<String>,
}

impl Default for IntentVocabulary {
    fn default() -> Self {
        Self {
            meta: DEFAULT_META_TERMS.iter().map(|s| s.to_string()).collect(),
            domain: DEFAULT_DOMAIN_TERMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IntentVocabulary {
    /// Reads `{"meta": [...], "domain": [...]}` from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ContextorError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ContextorError::Config(format!("cannot read vocabulary {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ContextorError::Config(format!("invalid vocabulary {}: {e}", path.display()))
        })
    }

    /// Splits a comma separated list, dropping blanks.
    pub fn parse_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Pure, deterministic query gate.
#[derive(Clone, Debug)]
pub struct IntentClassifier {
    meta: Vec<Vec<String>>,
    domain: Vec<Vec<String>>,
}

impl IntentClassifier {
    pub fn new(vocab: &IntentVocabulary) -> Self {
        Self {
            meta: compile(&vocab.meta),
            domain: compile(&vocab.domain),
        }
    }

    /// `true` when the query needs retrieval.
    pub fn classify(&self, query: &str) -> bool {
        let words = words(query);
        if self.meta.iter().any(|t| contains_phrase(&words, t)) {
            return false;
        }
        self.domain.iter().any(|t| contains_phrase(&words, t))
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(&IntentVocabulary::default())
    }
}

fn compile(terms: &[String]) -> Vec<Vec<String>> {
    terms
        .iter()
        .map(|t| words(t))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lowercased alphanumeric runs.
fn words(text: &str) -> Vec<String> {
    text.trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    words.windows(phrase.len()).any(|w| w == phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_short_circuit() {
        let c = IntentClassifier::default();
        assert!(!c.classify("hello"));
        assert!(!c.classify("  Hey!  "));
        assert!(!c.classify("who are you?"));
    }

    #[test]
    fn catalog_questions_need_context() {
        let c = IntentClassifier::default();
        assert!(c.classify("how many calories in a KitKat bar"));
        assert!(c.classify("Where can I buy Nesquik?"));
        assert!(c.classify("ingredients of Toll House cookies"));
    }

    #[test]
    fn meta_term_wins_over_domain_term() {
        let c = IntentClassifier::default();
        assert!(!c.classify("can you list chocolate products"));
        assert!(!c.classify("hi, what is in a kitkat"));
    }

    #[test]
    fn no_term_means_no_retrieval() {
        let c = IntentClassifier::default();
        assert!(!c.classify("the weather is nice"));
        assert!(!c.classify(""));
    }

    #[test]
    fn terms_match_whole_words_only() {
        let c = IntentClassifier::default();
        // "which" contains "hi", "available" contains "ai"
        assert!(c.classify("which chocolate is available"));
    }

    #[test]
    fn phrase_terms_must_be_contiguous() {
        let vocab = IntentVocabulary {
            meta: vec![],
            domain: vec!["where can i".into()],
        };
        let c = IntentClassifier::new(&vocab);
        assert!(c.classify("where can i find it"));
        assert!(!c.classify("where i can find it"));
    }

    #[test]
    fn vocabulary_list_parsing() {
        assert_eq!(
            IntentVocabulary::parse_list(" cereal, ,milo ,how many"),
            vec!["cereal", "milo", "how many"]
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let c = IntentClassifier::default();
        let q = "Nestlé product nutrition";
        let first = c.classify(q);
        for _ in 0..10 {
            assert_eq!(c.classify(q), first);
        }
        assert_eq!(c.classify(q), c.classify("  NESTLÉ PRODUCT NUTRITION "));
    }
}
