use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "resource_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Article,
    Video,
    Guide,
    Podcast,
}

/// Entry in the global, read-only resource library.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub resource_type: ResourceType,
    pub read_time: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// A user's bookmark and completion marks on a library resource.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UserResource {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub saved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserResource {
    pub fn new(user_id: Uuid, resource_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            resource_id,
            saved_at: None,
            completed_at: None,
            created_at: now,
        }
    }
}
