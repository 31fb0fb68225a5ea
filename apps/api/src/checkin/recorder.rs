//! Check-in submission: the single entry point of the progress pipeline.
//!
//! Flow: validate → reject duplicate week → store check-in and snapshot together →
//!       post-commit hooks (best effort) → derive key insights.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::checkin::hooks::{run_hooks, PostCommitHook};
use crate::checkin::validation::validate_check_in;
use crate::errors::AppError;
use crate::models::checkin::{CheckIn, CheckInResponses, JourneyStage};
use crate::models::snapshot::ProgressSnapshot;
use crate::progress::insights::key_insights;
use crate::progress::snapshot::record_week;
use crate::store::Store;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitCheckInRequest {
    pub user_id: Uuid,
    pub week_number: i32,
    pub journey_stage: JourneyStage,
    pub responses: CheckInResponses,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitCheckInResponse {
    pub check_in: CheckIn,
    pub snapshot: ProgressSnapshot,
    pub key_insights: Vec<String>,
}

fn duplicate_week(week_number: i32) -> AppError {
    AppError::Conflict(format!("Check-in for week {week_number} already exists"))
}

pub async fn submit_check_in(
    store: &dyn Store,
    hooks: &[Arc<dyn PostCommitHook>],
    request: SubmitCheckInRequest,
    now: DateTime<Utc>,
) -> Result<SubmitCheckInResponse, AppError> {
    let SubmitCheckInRequest {
        user_id,
        week_number,
        journey_stage,
        responses,
    } = request;

    validate_check_in(week_number, &responses)?;

    if store
        .find_check_in_for_week(user_id, week_number)
        .await?
        .is_some()
    {
        return Err(duplicate_week(week_number));
    }

    let check_in = CheckIn {
        id: Uuid::new_v4(),
        user_id,
        week_number,
        journey_stage,
        responses,
        completed_at: now,
    };
    // The unique index settles races the pre-check above cannot see.
    let snapshot = record_week(store, &check_in, now).await?;
    info!("Recorded week {week_number} check-in {} for user {user_id}", check_in.id);

    run_hooks(hooks, store, &check_in, now).await;

    let key_insights = key_insights(Some(&snapshot)).collect();

    Ok(SubmitCheckInResponse {
        check_in,
        snapshot,
        key_insights,
    })
}
