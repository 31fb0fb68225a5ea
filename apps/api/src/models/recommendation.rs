use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::resource::Resource;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    MostUrgent,
    Secondary,
    Preventive,
    Community,
}

impl Priority {
    /// Every batch carries exactly one recommendation per priority, in this order.
    pub const ALL: [Priority; 4] = [
        Priority::MostUrgent,
        Priority::Secondary,
        Priority::Preventive,
        Priority::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::MostUrgent => "most_urgent",
            Priority::Secondary => "secondary",
            Priority::Preventive => "preventive",
            Priority::Community => "community",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: Priority,
    pub resource_id: Uuid,
    pub why_this_helps: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One AI generation event. The latest batch per user governs the cooldown.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RecommendationBatch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub next_allowed_at: DateTime<Utc>,
    pub check_ins_used: Vec<Uuid>,
    #[sqlx(json)]
    pub recommendations: Vec<Recommendation>,
}

/// A recommendation joined with its catalog entry for display.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRecommendation {
    pub priority: Priority,
    pub resource: Option<Resource>,
    pub why_this_helps: String,
    pub tags: Vec<String>,
}
