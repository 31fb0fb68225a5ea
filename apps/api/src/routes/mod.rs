pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::checkin::handlers as checkins;
use crate::errors::AppError;
use crate::goals::handlers as goals;
use crate::progress::handlers as progress;
use crate::recommendations::handlers as recommendations;
use crate::resources::handlers as resources;
use crate::state::AppState;
use crate::store::Page;

const MAX_PAGE_SIZE: u32 = 100;

/// Caller identity for reads and in-place updates. Writes carry `user_id` in the body.
#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// `page`/`limit` query parameters shared by the list endpoints. Pages start at 1.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Pagination {
    pub fn resolve(&self, default_limit: u32) -> Result<Page, AppError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(default_limit);
        if page == 0 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Page {
            limit: i64::from(limit),
            offset: i64::from(page - 1) * i64::from(limit),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Check-ins
        .route("/api/v1/checkins", post(checkins::handle_submit_check_in))
        .route(
            "/api/v1/checkins/history",
            get(checkins::handle_check_in_history),
        )
        .route(
            "/api/v1/checkins/latest",
            get(checkins::handle_latest_check_in),
        )
        .route("/api/v1/checkins/:id", get(checkins::handle_get_check_in))
        // Insights
        .route(
            "/api/v1/insights/snapshot",
            get(progress::handle_get_snapshot),
        )
        .route("/api/v1/insights/trends", get(progress::handle_get_trends))
        .route(
            "/api/v1/insights/key-insights",
            get(progress::handle_get_key_insights),
        )
        .route(
            "/api/v1/insights/recommendations/can-generate",
            get(recommendations::handle_can_generate),
        )
        .route(
            "/api/v1/insights/recommendations/generate",
            post(recommendations::handle_generate),
        )
        .route(
            "/api/v1/insights/recommendations/latest",
            get(recommendations::handle_latest),
        )
        // Goals
        .route(
            "/api/v1/goals",
            get(goals::handle_list_goals).post(goals::handle_create_goal),
        )
        .route(
            "/api/v1/goals/suggestions",
            get(goals::handle_list_suggestions),
        )
        .route(
            "/api/v1/goals/:id",
            get(goals::handle_get_goal).delete(goals::handle_delete_goal),
        )
        .route(
            "/api/v1/goals/:id/progress",
            patch(goals::handle_increment_progress),
        )
        .route(
            "/api/v1/goals/:id/complete",
            patch(goals::handle_complete_goal),
        )
        // Resource library
        .route("/api/v1/resources", get(resources::handle_list_resources))
        .route(
            "/api/v1/resources/saved",
            get(resources::handle_list_saved_resources),
        )
        .route("/api/v1/resources/:id", get(resources::handle_get_resource))
        .route(
            "/api/v1/resources/:id/save",
            post(resources::handle_save_resource),
        )
        .route(
            "/api/v1/resources/:id/complete",
            post(resources::handle_complete_resource),
        )
        .with_state(state)
}
