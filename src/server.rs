//! HTTP endpoints wrapping the pipeline stages.
//!
//! Three POST routes, one per stage boundary. Stage-fatal errors map to
//! error statuses with a generic `{"error": ...}` body; isolated per-model
//! failures stay inside normal success responses as sentinel content.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::gateway::AdapterRegistry;
use crate::pipeline::{
    evaluate_responses, generate_responses, rank_top_three, select_top_three, EvaluationRecord,
    GeneratedResponse, PipelineError, Prompt,
};

/// Shared state behind every handler.
pub struct AppState {
    pub registry: AdapterRegistry,
}

impl AppState {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry }
    }
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let router = build_router(state);
    info!("arena API listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/generate", post(generate))
        .route("/api/v1/evaluate", post(evaluate))
        .route("/api/v1/rank", post(rank))
        .with_state(state)
}

type ApiError = (StatusCode, Json<Value>);

/// Map a stage-fatal error to an HTTP status and generic failure body.
fn error_response(err: PipelineError) -> ApiError {
    let status = match &err {
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::NoScoredModels => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::ArbiterOutput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::ArbiterTransport(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({
        "error": err.to_string(),
        "kind": err.kind(),
    });
    (status, Json(body))
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: Prompt,
    pub model_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub responses: Vec<GeneratedResponse>,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let responses = generate_responses(&state.registry, &req.prompt, &req.model_ids)
        .await
        .map_err(error_response)?;
    Ok(Json(GenerateResponse { responses }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub prompt: Prompt,
    pub responses: Vec<GeneratedResponse>,
    pub model_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub evaluations: Vec<EvaluationRecord>,
    /// Model ids with the three highest mean scores, best mean first.
    pub top_three: Vec<String>,
    /// Their responses, in generation order; feed directly into `/rank`.
    pub top_three_responses: Vec<GeneratedResponse>,
}

async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let evaluations =
        evaluate_responses(&state.registry, &req.prompt, &req.responses, &req.model_ids)
            .await
            .map_err(error_response)?;

    let top = select_top_three(&req.responses, &evaluations).map_err(error_response)?;

    Ok(Json(EvaluateResponse {
        evaluations,
        top_three: top.ids,
        top_three_responses: top.responses,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    pub prompt: Prompt,
    pub top_three_responses: Vec<GeneratedResponse>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    /// Model ids, best to worst.
    pub ranking: Vec<String>,
    pub reasoning: String,
}

async fn rank(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RankResponse>, ApiError> {
    let outcome = rank_top_three(&state.registry, &req.prompt, &req.top_three_responses)
        .await
        .map_err(error_response)?;
    Ok(Json(RankResponse {
        ranking: outcome.ordered_model_ids,
        reasoning: outcome.reasoning,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_400() {
        let (status, _) = error_response(PipelineError::InvalidInput("bad".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn no_scored_models_maps_to_422() {
        let (status, body) = error_response(PipelineError::NoScoredModels);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0["kind"], "no_scored_models");
    }

    #[test]
    fn arbiter_output_maps_to_422() {
        let (status, _) = error_response(PipelineError::ArbiterOutput("junk".into()));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
