use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "goal_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    Engagement,
    Learning,
    Community,
    Career,
    Personal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub category: GoalCategory,
    pub target_count: i32,
    pub current_count: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_suggested: bool,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(
        user_id: Uuid,
        title: impl Into<String>,
        category: GoalCategory,
        target_count: i32,
        due_date: Option<DateTime<Utc>>,
        is_suggested: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            category,
            target_count,
            current_count: 0,
            due_date,
            is_completed: false,
            completed_at: None,
            is_suggested,
            created_at: now,
        }
    }
}
