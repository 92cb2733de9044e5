//! Direct-invocation trigger for the analysis pipeline. The event-bus path in
//! [`crate::inbound::events`] is authoritative for new cards; this endpoint
//! exists for re-valuation and for callers that don't go through the event
//! bus, and passes through the same idempotency gate.

// internal
use crate::{
    domain::card::models::Card,
    domain::health::ports::HealthService,
    domain::pipeline::models::{PipelineInput, PipelineMode, PipelineOutcome},
    domain::pipeline::ports::PipelineService,
    inbound::http::{ApiError, AppState},
};
// external
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: Uuid,
    pub request_id: String,
    pub image_ref: String,
    pub expected_set: Option<String>,
    pub expected_rarity: Option<String>,
    #[serde(default)]
    pub revalue: bool,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzeResponse {
    Completed { card: Card },
    AlreadyInFlight { execution_id: String },
}

pub async fn trigger_analysis<PS, HS>(
    State(state): State<AppState<PS, HS>>,
    Path(card_id): Path<Uuid>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<AnalyzeResponse>), ApiError>
where
    PS: PipelineService,
    HS: HealthService,
{
    let input = PipelineInput {
        user_id: request.user_id,
        card_id,
        request_id: request.request_id,
        image_ref: request.image_ref,
        expected_set: request.expected_set,
        expected_rarity: request.expected_rarity,
        mode: if request.revalue {
            PipelineMode::Revalue
        } else {
            PipelineMode::NewCard
        },
        force_refresh: request.force_refresh,
    };

    let outcome = state
        .pipeline_service
        .submit(input)
        .await
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    let response = match outcome {
        PipelineOutcome::Completed(card) => AnalyzeResponse::Completed { card },
        PipelineOutcome::AlreadyInFlight { execution_id } => {
            AnalyzeResponse::AlreadyInFlight { execution_id }
        }
    };

    Ok((StatusCode::OK, Json(response)))
}
