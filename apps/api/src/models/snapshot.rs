use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Scores recorded for a single journey week.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyScore {
    pub week: i32,
    pub confidence: i32,
    pub work_readiness: i32,
    pub emotional_wellbeing: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Per-user aggregate of weekly scores and their change against the earliest week.
///
/// `weekly_scores` is kept sorted ascending by week with at most one entry per week.
/// `version` is bumped on every save and guards concurrent read-modify-write cycles.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ProgressSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(json)]
    pub weekly_scores: Vec<WeeklyScore>,
    pub current_confidence: i32,
    pub current_wellbeing: i32,
    pub current_work_readiness: i32,
    pub confidence_delta: i32,
    pub wellbeing_delta: i32,
    pub work_readiness_delta: i32,
    pub last_updated: DateTime<Utc>,
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// An empty snapshot for a user who has not checked in yet.
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            weekly_scores: Vec::new(),
            current_confidence: 0,
            current_wellbeing: 0,
            current_work_readiness: 0,
            confidence_delta: 0,
            wellbeing_delta: 0,
            work_readiness_delta: 0,
            last_updated: now,
            version: 0,
            created_at: now,
        }
    }
}
