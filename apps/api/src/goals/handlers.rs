use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::models::goal::{Goal, GoalCategory};
use crate::routes::{Pagination, UserIdQuery};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 200;
const GOALS_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub user_id: Uuid,
    pub title: String,
    pub category: GoalCategory,
    pub target_count: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateGoalRequest {
    fn validate(&self) -> Result<(), AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(format!(
                "title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        if self.target_count.is_some_and(|t| t < 1) {
            return Err(AppError::Validation(
                "target_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn goal_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Goal {id} not found"))
}

/// GET /api/v1/goals
pub async fn handle_list_goals(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
    ValidQuery(pagination): ValidQuery<Pagination>,
) -> Result<Json<ApiResponse<Vec<Goal>>>, AppError> {
    let page = pagination.resolve(GOALS_PAGE_SIZE)?;
    Ok(ApiResponse::ok(
        state.store.list_goals(params.user_id, page).await?,
    ))
}

/// POST /api/v1/goals
pub async fn handle_create_goal(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CreateGoalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Goal>>), AppError> {
    req.validate()?;
    let goal = Goal::new(
        req.user_id,
        req.title.trim(),
        req.category,
        req.target_count.unwrap_or(1),
        req.due_date,
        false,
        Utc::now(),
    );
    state.store.insert_goals(std::slice::from_ref(&goal)).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(goal)))
}

/// GET /api/v1/goals/suggestions
pub async fn handle_list_suggestions(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<Vec<Goal>>>, AppError> {
    Ok(ApiResponse::ok(
        state.store.list_open_suggestions(params.user_id).await?,
    ))
}

/// GET /api/v1/goals/:id
pub async fn handle_get_goal(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<Goal>>, AppError> {
    let goal = state
        .store
        .find_goal(params.user_id, id)
        .await?
        .ok_or_else(|| goal_not_found(id))?;
    Ok(ApiResponse::ok(goal))
}

/// PATCH /api/v1/goals/:id/progress
pub async fn handle_increment_progress(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<Goal>>, AppError> {
    let goal = state
        .store
        .advance_goal(params.user_id, id, Utc::now())
        .await?
        .ok_or_else(|| goal_not_found(id))?;
    Ok(ApiResponse::ok(goal))
}

/// PATCH /api/v1/goals/:id/complete
pub async fn handle_complete_goal(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<Goal>>, AppError> {
    let goal = state
        .store
        .complete_goal(params.user_id, id, Utc::now())
        .await?
        .ok_or_else(|| goal_not_found(id))?;
    Ok(ApiResponse::ok(goal))
}

/// DELETE /api/v1/goals/:id
pub async fn handle_delete_goal(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_goal(params.user_id, id).await? {
        return Err(goal_not_found(id));
    }
    Ok(Json(json!({ "success": true, "message": "Goal deleted" })))
}
