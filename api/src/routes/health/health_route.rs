//! GET /health: liveness plus per-profile LLM reachability.

use std::sync::Arc;

use ai_llm_service::health_service::HealthStatus;
use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub context_budget: BudgetReport,
    pub providers: Vec<HealthStatus>,
}

#[derive(Debug, Serialize)]
pub struct BudgetReport {
    pub max_tokens: usize,
    pub reserved_tokens: usize,
    pub available_tokens: usize,
}

/// Always `200`; unhealthy providers show up with `ok: false`.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let providers = match &state.llm {
        Some(llm) => llm.health_all().await,
        None => Vec::new(),
    };
    let status = if providers.iter().all(|p| p.ok) {
        "ok"
    } else {
        "degraded"
    };
    let b = state.pipeline.budget();
    Json(HealthReport {
        status,
        context_budget: BudgetReport {
            max_tokens: b.max_tokens,
            reserved_tokens: b.reserved_tokens,
            available_tokens: b.available(),
        },
        providers,
    })
}
