use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::extract::{ValidPath, ValidQuery};
use crate::models::resource::{Resource, ResourceType, UserResource};
use crate::routes::{Pagination, UserIdQuery};
use crate::state::AppState;

const RESOURCES_PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct ResourceFilter {
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,
    /// Comma-separated; a resource matches when it carries any of them.
    #[serde(alias = "tag")]
    pub tags: Option<String>,
    /// Free text matched against title, description and tags.
    pub q: Option<String>,
}

impl ResourceFilter {
    fn matches(&self, resource: &Resource) -> bool {
        self.resource_type.map_or(true, |t| resource.resource_type == t)
            && self.matches_tags(resource)
            && self.matches_text(resource)
    }

    fn matches_tags(&self, resource: &Resource) -> bool {
        let mut wanted = self
            .tags
            .iter()
            .flat_map(|tags| tags.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .peekable();
        if wanted.peek().is_none() {
            return true;
        }
        wanted.any(|want| resource.tags.iter().any(|t| t.eq_ignore_ascii_case(want)))
    }

    fn matches_text(&self, resource: &Resource) -> bool {
        let Some(needle) = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        let hit = |text: &str| text.to_lowercase().contains(&needle);
        hit(&resource.title)
            || resource.description.as_deref().is_some_and(hit)
            || resource.tags.iter().any(|t| hit(t))
    }
}

/// A saved resource with the caller's marks on it.
#[derive(Debug, Serialize)]
pub struct SavedResource {
    pub saved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub resource: Resource,
}

async fn find_resource(state: &AppState, id: Uuid) -> Result<Resource, AppError> {
    state
        .store
        .find_resources(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("Resource {id} not found")))
}

/// GET /api/v1/resources
pub async fn handle_list_resources(
    State(state): State<AppState>,
    ValidQuery(filter): ValidQuery<ResourceFilter>,
    ValidQuery(pagination): ValidQuery<Pagination>,
) -> Result<Json<ApiResponse<Vec<Resource>>>, AppError> {
    let page = pagination.resolve(RESOURCES_PAGE_SIZE)?;
    let resources = state
        .store
        .list_resources()
        .await?
        .into_iter()
        .filter(|r| filter.matches(r))
        .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
        .collect();
    Ok(ApiResponse::ok(resources))
}

/// GET /api/v1/resources/saved
pub async fn handle_list_saved_resources(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
    ValidQuery(pagination): ValidQuery<Pagination>,
) -> Result<Json<ApiResponse<Vec<SavedResource>>>, AppError> {
    let page = pagination.resolve(RESOURCES_PAGE_SIZE)?;
    let marks = state
        .store
        .list_saved_resources(params.user_id, page)
        .await?;
    let ids: Vec<Uuid> = marks.iter().map(|m| m.resource_id).collect();
    let mut resources = state.store.find_resources(&ids).await?;

    let saved = marks
        .into_iter()
        .filter_map(|mark| {
            let pos = resources.iter().position(|r| r.id == mark.resource_id)?;
            Some(SavedResource {
                saved_at: mark.saved_at,
                completed_at: mark.completed_at,
                resource: resources.swap_remove(pos),
            })
        })
        .collect();
    Ok(ApiResponse::ok(saved))
}

/// GET /api/v1/resources/:id
pub async fn handle_get_resource(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<ApiResponse<Resource>>, AppError> {
    Ok(ApiResponse::ok(find_resource(&state, id).await?))
}

/// POST /api/v1/resources/:id/save
pub async fn handle_save_resource(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<UserResource>>, AppError> {
    find_resource(&state, id).await?;
    let mark = state
        .store
        .save_resource(params.user_id, id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(mark))
}

/// POST /api/v1/resources/:id/complete
pub async fn handle_complete_resource(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(params): ValidQuery<UserIdQuery>,
) -> Result<Json<ApiResponse<UserResource>>, AppError> {
    find_resource(&state, id).await?;
    let mark = state
        .store
        .complete_resource(params.user_id, id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(mark))
}
