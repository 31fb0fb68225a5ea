use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "journey_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JourneyStage {
    Preparing,
    OnLeave,
    Returning,
}

/// Answers to the weekly survey. Scores are on a 1–5 scale when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckInResponses {
    pub confidence: Option<i32>,
    pub emotional_wellbeing: Option<i32>,
    pub work_readiness: Option<i32>,
    #[serde(default)]
    pub support_needs: Vec<String>,
    pub biggest_challenge: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_number: i32,
    pub journey_stage: JourneyStage,
    #[sqlx(json)]
    pub responses: CheckInResponses,
    pub completed_at: DateTime<Utc>,
}
