//! POST /api/chat: answers a catalog question with RAG context.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use contextor::ChatReply;

use crate::{core::app_state::AppState, error_handler::AppResult, routes::chat::chat_request::ChatQuery};

/// Handler: POST /api/chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/api/chat \
///   -H 'content-type: application/json' \
///   -d '{"query":"how many calories in a KitKat bar"}'
/// ```
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatQuery>, JsonRejection>,
) -> AppResult<Json<ChatReply>> {
    let Json(body) = payload?;
    let reply = state.pipeline.answer(&body.query).await?;
    Ok(Json(reply))
}
