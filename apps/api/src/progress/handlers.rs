use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::{ApiResponse, AppError};
use crate::extract::ValidQuery;
use crate::models::snapshot::ProgressSnapshot;
use crate::progress::insights::key_insights;
use crate::routes::UserIdQuery;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub score: i32,
    pub delta: i32,
}

#[derive(Debug, Serialize)]
pub struct SnapshotSummary {
    pub confidence: MetricSummary,
    pub emotional_wellbeing: MetricSummary,
    pub work_readiness: MetricSummary,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub week: i32,
    pub confidence: i32,
    pub work_readiness: i32,
    pub wellbeing: i32,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub weeks: Vec<TrendPoint>,
}

impl From<&ProgressSnapshot> for SnapshotSummary {
    fn from(s: &ProgressSnapshot) -> Self {
        Self {
            confidence: MetricSummary {
                score: s.current_confidence,
                delta: s.confidence_delta,
            },
            emotional_wellbeing: MetricSummary {
                score: s.current_wellbeing,
                delta: s.wellbeing_delta,
            },
            work_readiness: MetricSummary {
                score: s.current_work_readiness,
                delta: s.work_readiness_delta,
            },
        }
    }
}

async fn require_snapshot(
    state: &AppState,
    user_id: uuid::Uuid,
) -> Result<ProgressSnapshot, AppError> {
    state
        .store
        .find_snapshot(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Snapshot not found".to_string()))
}

/// GET /api/v1/insights/snapshot
pub async fn handle_get_snapshot(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<SnapshotSummary>>, AppError> {
    let snapshot = require_snapshot(&state, params.user_id).await?;
    Ok(ApiResponse::ok(SnapshotSummary::from(&snapshot)))
}

/// GET /api/v1/insights/trends
pub async fn handle_get_trends(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<TrendsResponse>>, AppError> {
    let snapshot = require_snapshot(&state, params.user_id).await?;
    let weeks = snapshot
        .weekly_scores
        .iter()
        .map(|w| TrendPoint {
            week: w.week,
            confidence: w.confidence,
            work_readiness: w.work_readiness,
            wellbeing: w.emotional_wellbeing,
        })
        .collect();
    Ok(ApiResponse::ok(TrendsResponse { weeks }))
}

/// GET /api/v1/insights/key-insights
///
/// Unlike the snapshot endpoints this never 404s: no snapshot means no insights.
pub async fn handle_get_key_insights(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let snapshot = state.store.find_snapshot(params.user_id).await?;
    Ok(ApiResponse::ok(key_insights(snapshot.as_ref()).collect()))
}
