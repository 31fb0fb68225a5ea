use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::checkin::recorder::{submit_check_in, SubmitCheckInRequest, SubmitCheckInResponse};
use crate::errors::{ApiResponse, AppError};
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::models::checkin::CheckIn;
use crate::routes::{Pagination, UserIdQuery};
use crate::state::AppState;

/// A year of weekly check-ins fits on one page.
const HISTORY_PAGE_SIZE: u32 = 52;

/// POST /api/v1/checkins
pub async fn handle_submit_check_in(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SubmitCheckInRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmitCheckInResponse>>), AppError> {
    let response = submit_check_in(state.store.as_ref(), &state.hooks, req, Utc::now()).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(response)))
}

/// GET /api/v1/checkins/history
pub async fn handle_check_in_history(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
    ValidQuery(pagination): ValidQuery<Pagination>,
) -> Result<Json<ApiResponse<Vec<CheckIn>>>, AppError> {
    let page = pagination.resolve(HISTORY_PAGE_SIZE)?;
    Ok(ApiResponse::ok(
        state.store.list_check_ins(params.user_id, page).await?,
    ))
}

/// GET /api/v1/checkins/latest
pub async fn handle_latest_check_in(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<CheckIn>>, AppError> {
    let latest = state
        .store
        .recent_check_ins(params.user_id, 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("No check-in found".to_string()))?;
    Ok(ApiResponse::ok(latest))
}

/// GET /api/v1/checkins/:id
pub async fn handle_get_check_in(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<CheckIn>>, AppError> {
    let check_in = state
        .store
        .find_check_in(params.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Check-in {id} not found")))?;
    Ok(ApiResponse::ok(check_in))
}
