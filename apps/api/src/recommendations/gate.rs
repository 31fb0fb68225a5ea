//! Cooldown gate in front of AI recommendation generation.
//!
//! A user may generate a new batch once they have at least `MIN_CHECK_INS`
//! check-ins and their most recent batch's cooldown has expired.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::recommendation::{Recommendation, RecommendationBatch};
use crate::store::Store;

pub const MIN_CHECK_INS: i64 = 2;
pub const COOLDOWN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NeedMoreCheckins,
    CooldownActive,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Eligibility {
    pub can_generate: bool,
    pub reason: Option<DenialReason>,
    /// Cooldown end of the latest batch, if the user has one.
    pub next_allowed_at: Option<DateTime<Utc>>,
}

impl Eligibility {
    pub fn into_result(self) -> Result<(), AppError> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(AppError::RateLimited {
                reason,
                next_allowed_at: self.next_allowed_at,
            }),
        }
    }
}

pub async fn can_generate(
    store: &dyn Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Eligibility, AppError> {
    let check_ins = store.count_check_ins(user_id).await?;
    let latest = store.latest_recommendation(user_id).await?;
    let next_allowed_at = latest.as_ref().map(|b| b.next_allowed_at);

    let reason = if check_ins < MIN_CHECK_INS {
        Some(DenialReason::NeedMoreCheckins)
    } else if next_allowed_at.is_some_and(|at| now < at) {
        Some(DenialReason::CooldownActive)
    } else {
        None
    };

    Ok(Eligibility {
        can_generate: reason.is_none(),
        reason,
        next_allowed_at,
    })
}

/// Persists a generated batch and starts a new cooldown.
///
/// The gate is evaluated again here and the insert itself is conditional on no
/// running cooldown, so concurrent generations for one user record at most one batch.
pub async fn record_generation(
    store: &dyn Store,
    user_id: Uuid,
    check_ins_used: Vec<Uuid>,
    recommendations: Vec<Recommendation>,
    now: DateTime<Utc>,
) -> Result<RecommendationBatch, AppError> {
    can_generate(store, user_id, now).await?.into_result()?;

    let batch = RecommendationBatch {
        id: Uuid::new_v4(),
        user_id,
        generated_at: now,
        next_allowed_at: now + Duration::days(COOLDOWN_DAYS),
        check_ins_used,
        recommendations,
    };

    if !store.insert_recommendation_if_allowed(&batch, now).await? {
        let latest = store.latest_recommendation(user_id).await?;
        return Err(AppError::RateLimited {
            reason: DenialReason::CooldownActive,
            next_allowed_at: latest.map(|b| b.next_allowed_at),
        });
    }

    info!(
        "Recorded recommendation batch {} for user {user_id}; next allowed at {}",
        batch.id, batch.next_allowed_at
    );
    Ok(batch)
}
