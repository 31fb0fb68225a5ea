use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::extract::{ValidJson, ValidQuery};
use crate::models::recommendation::RecommendationBatch;
use crate::recommendations::gate::{can_generate, Eligibility};
use crate::recommendations::service::{generate_batch, latest_batch, LatestRecommendations};
use crate::routes::UserIdQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRecommendationsRequest {
    pub user_id: Uuid,
}

/// GET /api/v1/insights/recommendations/can-generate
pub async fn handle_can_generate(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<Eligibility>>, AppError> {
    let eligibility = can_generate(state.store.as_ref(), params.user_id, Utc::now()).await?;
    Ok(ApiResponse::ok(eligibility))
}

/// POST /api/v1/insights/recommendations/generate
///
/// Runs the generator under the configured timeout. A denial from the cooldown
/// gate comes back as 400 with `NEED_MORE_CHECKINS` or `COOLDOWN_ACTIVE`.
pub async fn handle_generate(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<GenerateRecommendationsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecommendationBatch>>), AppError> {
    let batch = generate_batch(
        state.store.as_ref(),
        state.recommender.as_ref(),
        state.config.recommendation_timeout,
        req.user_id,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(batch)))
}

/// GET /api/v1/insights/recommendations/latest
pub async fn handle_latest(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<LatestRecommendations>>, AppError> {
    let latest = latest_batch(state.store.as_ref(), params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No recommendations generated yet".to_string()))?;
    Ok(ApiResponse::ok(latest))
}
