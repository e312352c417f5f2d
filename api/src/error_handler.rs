use ai_llm_service::AiLlmError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::{ContextorError, Stage};
use rag_store::RagError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error(transparent)]
    Search(#[from] RagError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / pipeline ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] ContextorError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(ContextorError::Upstream { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // startup-only
            AppError::Config(_) | AppError::Llm(_) | AppError::Search(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Bind(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Llm(_) => "LLM_CONFIG_ERROR",
            AppError::Search(_) => "SEARCH_CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Pipeline(e) => match e {
                ContextorError::Upstream { stage, .. } => match stage {
                    Stage::Rewrite => "REWRITE_FAILED",
                    Stage::Embedding => "EMBEDDING_FAILED",
                    Stage::Search => "SEARCH_FAILED",
                    Stage::Compose => "COMPLETION_FAILED",
                },
                ContextorError::Schema(_) => "ANSWER_SCHEMA_ERROR",
                ContextorError::Config(_) => "CONFIG_ERROR",
            },
        }
    }

    /// Caller-facing message; upstream internals stay in the logs.
    fn detail(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Pipeline(ContextorError::Upstream { stage, .. }) => {
                stage.public_message().to_string()
            }
            AppError::Pipeline(ContextorError::Schema(_)) => {
                "Failed to parse generated response".to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorBody {
            detail: self.detail(),
            code: self.error_code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_maps_to_bad_gateway_with_generic_detail() {
        let err = AppError::from(ContextorError::upstream(
            Stage::Search,
            "tcp connect error: 10.0.0.4:443",
        ));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "SEARCH_FAILED");
        assert_eq!(err.detail(), "Failed to search documents");
    }

    #[test]
    fn schema_maps_to_internal_error() {
        let err = AppError::from(ContextorError::Schema("expected value".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "ANSWER_SCHEMA_ERROR");
        assert!(!err.detail().contains("expected value"));
    }
}
