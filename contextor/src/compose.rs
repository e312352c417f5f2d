//! Answer Composer: grounded, schema-shaped answer from the context block.

use std::{sync::Arc, time::Duration, time::Instant};

use ai_llm_service::ChatRequest;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{error, info};

use crate::error::{ContextorError, Stage};
use crate::llm::{CompletionKind, CompletionService, strip_code_fence};
use crate::prompt::build_user_prompt;
use crate::rewrite::timed_out;
use crate::short;

/// Product card answer returned to the caller.
///
/// # Example
/// ```
/// use contextor::Answer;
/// let a: Answer = serde_json::from_str(r#"{"mainAnswer": "230 kcal"}"#).unwrap();
/// assert!(a.product_details.is_empty());
/// assert_eq!(a.reference_link, None);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub main_answer: String,
    #[serde(default)]
    pub product_details: Vec<ProductDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_info: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub name: String,
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct ComposeSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

pub struct AnswerComposer {
    completion: Arc<dyn CompletionService>,
    system: String,
    settings: ComposeSettings,
}

impl AnswerComposer {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        system: impl Into<String>,
        settings: ComposeSettings,
    ) -> Self {
        Self {
            completion,
            system: system.into(),
            settings,
        }
    }

    /// # Errors
    /// `Upstream { stage: Compose }` when the completion call fails,
    /// `Schema` when the reply is not an [`Answer`].
    pub async fn compose(&self, query: &str, context: &str) -> Result<Answer, ContextorError> {
        let user = build_user_prompt(context, query);
        let req = ChatRequest::new(&user)
            .with_system(&self.system)
            .with_sampling(self.settings.temperature, self.settings.max_tokens)
            .json();

        let started = Instant::now();
        let raw = match timeout(
            self.settings.timeout,
            self.completion.complete(CompletionKind::Answer, req),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                error!(stage = "compose", query = %short(query), error = %e, "answer generation failed");
                return Err(ContextorError::upstream(Stage::Compose, e));
            }
            Err(_) => {
                error!(stage = "compose", query = %short(query), "answer generation timed out");
                return Err(timed_out(Stage::Compose, self.settings.timeout));
            }
        };
        info!(
            stage = "compose",
            latency_ms = started.elapsed().as_millis() as u64,
            "answer generated"
        );

        parse_answer(&raw)
    }
}

pub fn parse_answer(raw: &str) -> Result<Answer, ContextorError> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        error!(stage = "compose", error = %e, "answer does not match schema");
        ContextorError::Schema(e.to_string())
    })
}
