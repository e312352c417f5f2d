//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FieldMap;
use crate::errors::RagError;

/// A retrieved catalog excerpt with provenance and relevance score.
///
/// Scores are only meaningful for ordering within one query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub content: String,
    pub source: String,
    pub score: f32,
}

impl ScoredPassage {
    pub fn new(content: impl Into<String>, source: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            score,
        }
    }

    /// Maps a JSON document (Azure hit or Qdrant payload) to a passage.
    ///
    /// The content field is required; a missing source falls back to an
    /// empty string so the passage can still ground an answer.
    pub(crate) fn from_document(
        doc: &Value,
        fields: &FieldMap,
        score: f32,
    ) -> Result<Self, RagError> {
        let content = doc
            .get(&fields.content)
            .and_then(Value::as_str)
            .ok_or_else(|| RagError::MissingField(fields.content.clone()))?;
        let source = match doc.get(&fields.source) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Ok(Self::new(content, source, score))
    }
}
