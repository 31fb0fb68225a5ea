//! Persistence boundary for the check-in pipeline.
//!
//! Services and handlers only talk to `dyn Store`. `PgStore` is the production
//! backend; `MemoryStore` backs the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::checkin::CheckIn;
use crate::models::goal::{Goal, GoalCategory};
use crate::models::recommendation::RecommendationBatch;
use crate::models::resource::{Resource, UserResource};
use crate::models::snapshot::ProgressSnapshot;
use crate::models::user::User;

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Duplicate(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One window of a listing, already resolved to SQL `LIMIT`/`OFFSET` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Logical operations the core issues against the document store.
///
/// Every per-user lookup takes the owning `user_id`; rows owned by someone else
/// are indistinguishable from missing rows.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Check-ins ───────────────────────────────────────────────────────────

    /// Inserts a check-in together with the snapshot it produced, in one transaction.
    ///
    /// Fails with `StoreError::Duplicate` when the user already has a check-in for
    /// that week. The snapshot write is a compare-and-swap: `expected_version = None`
    /// inserts a first snapshot for the user, otherwise the stored row is replaced
    /// only if it still carries `expected_version`. Returns `false`, with nothing
    /// written, when another writer got there first.
    async fn record_check_in(
        &self,
        check_in: &CheckIn,
        snapshot: &ProgressSnapshot,
        expected_version: Option<i64>,
    ) -> StoreResult<bool>;

    async fn find_check_in(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<CheckIn>>;

    async fn find_check_in_for_week(
        &self,
        user_id: Uuid,
        week_number: i32,
    ) -> StoreResult<Option<CheckIn>>;

    /// Check-ins ascending by week, one page at a time.
    async fn list_check_ins(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<CheckIn>>;

    /// The `limit` most recent check-ins, descending by week.
    async fn recent_check_ins(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<CheckIn>>;

    async fn count_check_ins(&self, user_id: Uuid) -> StoreResult<i64>;

    // ── Progress snapshots ──────────────────────────────────────────────────

    async fn find_snapshot(&self, user_id: Uuid) -> StoreResult<Option<ProgressSnapshot>>;

    // ── Goals ───────────────────────────────────────────────────────────────

    /// Goals newest first, one page at a time.
    async fn list_goals(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Goal>>;

    async fn list_open_goals(
        &self,
        user_id: Uuid,
        category: GoalCategory,
    ) -> StoreResult<Vec<Goal>>;

    async fn list_open_suggestions(&self, user_id: Uuid) -> StoreResult<Vec<Goal>>;

    async fn find_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Goal>>;

    /// Inserts all goals in one transaction.
    async fn insert_goals(&self, goals: &[Goal]) -> StoreResult<()>;

    /// Atomically counts one unit of progress. Reaching the target completes the
    /// goal; `completed_at` is stamped the first time only.
    async fn advance_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Goal>>;

    /// Atomically forces completion, filling the counter up to the target.
    async fn complete_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Goal>>;

    async fn delete_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;

    // ── Recommendation batches ──────────────────────────────────────────────

    async fn latest_recommendation(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<RecommendationBatch>>;

    /// Inserts the batch unless the user holds a batch whose cooldown is still
    /// running at `now`. Returns whether the batch was written.
    async fn insert_recommendation_if_allowed(
        &self,
        batch: &RecommendationBatch,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // ── Read-only collaborators ─────────────────────────────────────────────

    async fn list_resources(&self) -> StoreResult<Vec<Resource>>;

    async fn find_resources(&self, ids: &[Uuid]) -> StoreResult<Vec<Resource>>;

    // ── Per-user resource marks ─────────────────────────────────────────────

    /// Bookmarks a resource, creating the user's mark row on first use.
    /// Saving again moves `saved_at` forward.
    async fn save_resource(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<UserResource>;

    /// Marks a resource as completed, creating the mark row on first use.
    async fn complete_resource(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<UserResource>;

    /// Saved marks, most recently saved first.
    async fn list_saved_resources(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<UserResource>>;

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;
}
