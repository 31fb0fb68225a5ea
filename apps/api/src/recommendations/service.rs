//! Recommendation pipeline.
//!
//! Flow: gate → recent check-ins + profile + catalog → generator (bounded by a
//!       timeout) → validate output → record batch and start cooldown.
//!
//! Nothing is persisted unless every step succeeds, so a failed or timed-out
//! generation leaves the user free to retry immediately.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::recommendation::{
    Priority, Recommendation, RecommendationBatch, ResolvedRecommendation,
};
use crate::models::resource::Resource;
use crate::models::user::DEFAULT_ROLE;
use crate::recommendations::gate::{can_generate, record_generation};
use crate::recommendations::generator::{RecommendationGenerator, UserProfile};
use crate::store::Store;

/// How many of the latest check-ins are shown to the generator.
pub const RECENT_CHECK_INS: i64 = 4;

#[derive(Debug, Clone, Serialize)]
pub struct LatestRecommendations {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub next_allowed_at: DateTime<Utc>,
    pub recommendations: Vec<ResolvedRecommendation>,
}

fn malformed(detail: String) -> AppError {
    AppError::ExternalService(format!("Malformed recommendation output: {detail}"))
}

/// Checks generator output against the catalog and orders it by priority.
fn validate_recommendations(
    mut recommendations: Vec<Recommendation>,
    catalog: &[Resource],
) -> Result<Vec<Recommendation>, AppError> {
    if recommendations.len() != Priority::ALL.len() {
        return Err(malformed(format!(
            "expected {} recommendations, got {}",
            Priority::ALL.len(),
            recommendations.len()
        )));
    }

    let known: HashSet<Uuid> = catalog.iter().map(|r| r.id).collect();
    let mut seen = HashSet::new();
    for rec in &recommendations {
        if !seen.insert(rec.priority) {
            return Err(malformed(format!(
                "priority '{}' appears more than once",
                rec.priority.as_str()
            )));
        }
        if !known.contains(&rec.resource_id) {
            return Err(malformed(format!("unknown resource {}", rec.resource_id)));
        }
        if rec.why_this_helps.trim().is_empty() {
            return Err(malformed(format!(
                "empty explanation for '{}'",
                rec.priority.as_str()
            )));
        }
    }

    recommendations.sort_by_key(|r| Priority::ALL.iter().position(|p| *p == r.priority));
    Ok(recommendations)
}

pub async fn generate_batch(
    store: &dyn Store,
    generator: &dyn RecommendationGenerator,
    timeout: Duration,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<RecommendationBatch, AppError> {
    can_generate(store, user_id, now).await?.into_result()?;

    let recent = store.recent_check_ins(user_id, RECENT_CHECK_INS).await?;
    let role = store
        .find_user(user_id)
        .await?
        .map(|u| u.role)
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());
    let profile = UserProfile {
        role,
        journey_stage: recent.first().map(|c| c.journey_stage),
    };

    let catalog = store.list_resources().await?;
    if catalog.is_empty() {
        return Err(AppError::Internal(anyhow!("The resource catalog is empty")));
    }

    info!(
        "Generating recommendations for user {user_id} from {} check-in(s)",
        recent.len()
    );
    let generated = tokio::time::timeout(timeout, generator.generate(&profile, &recent, &catalog))
        .await
        .map_err(|_| {
            warn!(
                "Recommendation generation for user {user_id} timed out after {}s",
                timeout.as_secs()
            );
            AppError::ExternalService(format!(
                "Recommendation generation timed out after {}s",
                timeout.as_secs()
            ))
        })??;

    let recommendations = validate_recommendations(generated, &catalog)?;
    let check_ins_used = recent.iter().map(|c| c.id).collect();

    record_generation(store, user_id, check_ins_used, recommendations, now).await
}

/// Returns the newest batch with each recommendation joined to its resource.
/// A resource removed from the catalog since generation resolves to `None`.
pub async fn latest_batch(
    store: &dyn Store,
    user_id: Uuid,
) -> Result<Option<LatestRecommendations>, AppError> {
    let Some(batch) = store.latest_recommendation(user_id).await? else {
        return Ok(None);
    };

    let ids: Vec<Uuid> = batch.recommendations.iter().map(|r| r.resource_id).collect();
    let resources: HashMap<Uuid, Resource> = store
        .find_resources(&ids)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let recommendations = batch
        .recommendations
        .into_iter()
        .map(|r| ResolvedRecommendation {
            priority: r.priority,
            resource: resources.get(&r.resource_id).cloned(),
            why_this_helps: r.why_this_helps,
            tags: r.tags,
        })
        .collect();

    Ok(Some(LatestRecommendations {
        id: batch.id,
        generated_at: batch.generated_at,
        next_allowed_at: batch.next_allowed_at,
        recommendations,
    }))
}
