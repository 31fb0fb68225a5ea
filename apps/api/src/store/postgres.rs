use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::checkin::CheckIn;
use crate::models::goal::{Goal, GoalCategory};
use crate::models::recommendation::RecommendationBatch;
use crate::models::resource::{Resource, UserResource};
use crate::models::snapshot::ProgressSnapshot;
use crate::models::user::User;
use crate::store::{Page, Store, StoreError, StoreResult};

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[async_trait]
impl Store for PgStore {
    async fn record_check_in(
        &self,
        check_in: &CheckIn,
        snapshot: &ProgressSnapshot,
        expected_version: Option<i64>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO check_ins (id, user_id, week_number, journey_stage, responses, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(check_in.id)
        .bind(check_in.user_id)
        .bind(check_in.week_number)
        .bind(check_in.journey_stage)
        .bind(Json(&check_in.responses))
        .bind(check_in.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!(
                    "Check-in for week {} already exists",
                    check_in.week_number
                ))
            } else {
                StoreError::Database(e)
            }
        })?;

        let result = match expected_version {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO progress_snapshots
                        (id, user_id, weekly_scores, current_confidence, current_wellbeing,
                         current_work_readiness, confidence_delta, wellbeing_delta,
                         work_readiness_delta, last_updated, version, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                    ON CONFLICT (user_id) DO NOTHING
                    "#,
                )
                .bind(snapshot.id)
                .bind(snapshot.user_id)
                .bind(Json(&snapshot.weekly_scores))
                .bind(snapshot.current_confidence)
                .bind(snapshot.current_wellbeing)
                .bind(snapshot.current_work_readiness)
                .bind(snapshot.confidence_delta)
                .bind(snapshot.wellbeing_delta)
                .bind(snapshot.work_readiness_delta)
                .bind(snapshot.last_updated)
                .bind(snapshot.version)
                .bind(snapshot.created_at)
                .execute(&mut *tx)
                .await?
            }
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE progress_snapshots
                    SET weekly_scores = $2,
                        current_confidence = $3,
                        current_wellbeing = $4,
                        current_work_readiness = $5,
                        confidence_delta = $6,
                        wellbeing_delta = $7,
                        work_readiness_delta = $8,
                        last_updated = $9,
                        version = $10
                    WHERE user_id = $1 AND version = $11
                    "#,
                )
                .bind(snapshot.user_id)
                .bind(Json(&snapshot.weekly_scores))
                .bind(snapshot.current_confidence)
                .bind(snapshot.current_wellbeing)
                .bind(snapshot.current_work_readiness)
                .bind(snapshot.confidence_delta)
                .bind(snapshot.wellbeing_delta)
                .bind(snapshot.work_readiness_delta)
                .bind(snapshot.last_updated)
                .bind(snapshot.version)
                .bind(expected)
                .execute(&mut *tx)
                .await?
            }
        };

        if result.rows_affected() != 1 {
            // Lost the snapshot race: the check-in must not outlive it.
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn find_check_in(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<CheckIn>> {
        Ok(
            sqlx::query_as::<_, CheckIn>("SELECT * FROM check_ins WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_check_in_for_week(
        &self,
        user_id: Uuid,
        week_number: i32,
    ) -> StoreResult<Option<CheckIn>> {
        Ok(sqlx::query_as::<_, CheckIn>(
            "SELECT * FROM check_ins WHERE user_id = $1 AND week_number = $2",
        )
        .bind(user_id)
        .bind(week_number)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_check_ins(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<CheckIn>> {
        Ok(sqlx::query_as::<_, CheckIn>(
            "SELECT * FROM check_ins WHERE user_id = $1 ORDER BY week_number ASC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn recent_check_ins(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<CheckIn>> {
        Ok(sqlx::query_as::<_, CheckIn>(
            "SELECT * FROM check_ins WHERE user_id = $1 ORDER BY week_number DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_check_ins(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM check_ins WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn find_snapshot(&self, user_id: Uuid) -> StoreResult<Option<ProgressSnapshot>> {
        Ok(sqlx::query_as::<_, ProgressSnapshot>(
            "SELECT * FROM progress_snapshots WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_goals(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Goal>> {
        Ok(sqlx::query_as::<_, Goal>(
            "SELECT * FROM goals WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_open_goals(
        &self,
        user_id: Uuid,
        category: GoalCategory,
    ) -> StoreResult<Vec<Goal>> {
        Ok(sqlx::query_as::<_, Goal>(
            r#"
            SELECT * FROM goals
            WHERE user_id = $1 AND category = $2 AND is_completed = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_open_suggestions(&self, user_id: Uuid) -> StoreResult<Vec<Goal>> {
        Ok(sqlx::query_as::<_, Goal>(
            r#"
            SELECT * FROM goals
            WHERE user_id = $1 AND is_suggested = TRUE AND is_completed = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Goal>> {
        Ok(
            sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_goals(&self, goals: &[Goal]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for goal in goals {
            sqlx::query(
                r#"
                INSERT INTO goals
                    (id, user_id, title, category, target_count, current_count, due_date,
                     is_completed, completed_at, is_suggested, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(goal.id)
            .bind(goal.user_id)
            .bind(&goal.title)
            .bind(goal.category)
            .bind(goal.target_count)
            .bind(goal.current_count)
            .bind(goal.due_date)
            .bind(goal.is_completed)
            .bind(goal.completed_at)
            .bind(goal.is_suggested)
            .bind(goal.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn advance_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Goal>> {
        // Right-hand side expressions see the pre-update row.
        Ok(sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET current_count = current_count + 1,
                is_completed = is_completed OR current_count + 1 >= target_count,
                completed_at = COALESCE(
                    completed_at,
                    CASE WHEN current_count + 1 >= target_count THEN $3 END
                )
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn complete_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Goal>> {
        Ok(sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET current_count = target_count,
                is_completed = TRUE,
                completed_at = COALESCE(completed_at, $3)
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn latest_recommendation(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<RecommendationBatch>> {
        Ok(sqlx::query_as::<_, RecommendationBatch>(
            r#"
            SELECT * FROM recommendation_batches
            WHERE user_id = $1
            ORDER BY generated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_recommendation_if_allowed(
        &self,
        batch: &RecommendationBatch,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Serializes cooldown checks for this user until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(batch.user_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO recommendation_batches
                (id, user_id, generated_at, next_allowed_at, check_ins_used, recommendations)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (
                SELECT 1 FROM recommendation_batches
                WHERE user_id = $2 AND next_allowed_at > $7
            )
            "#,
        )
        .bind(batch.id)
        .bind(batch.user_id)
        .bind(batch.generated_at)
        .bind(batch.next_allowed_at)
        .bind(&batch.check_ins_used)
        .bind(Json(&batch.recommendations))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_resources(&self) -> StoreResult<Vec<Resource>> {
        Ok(
            sqlx::query_as::<_, Resource>("SELECT * FROM resources ORDER BY title ASC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn find_resources(&self, ids: &[Uuid]) -> StoreResult<Vec<Resource>> {
        Ok(
            sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn save_resource(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<UserResource> {
        let mark = UserResource::new(user_id, resource_id, now);
        Ok(sqlx::query_as::<_, UserResource>(
            r#"
            INSERT INTO user_resources (id, user_id, resource_id, saved_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, resource_id) DO UPDATE SET saved_at = EXCLUDED.saved_at
            RETURNING *
            "#,
        )
        .bind(mark.id)
        .bind(mark.user_id)
        .bind(mark.resource_id)
        .bind(now)
        .bind(mark.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn complete_resource(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<UserResource> {
        let mark = UserResource::new(user_id, resource_id, now);
        Ok(sqlx::query_as::<_, UserResource>(
            r#"
            INSERT INTO user_resources (id, user_id, resource_id, completed_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, resource_id) DO UPDATE SET completed_at = EXCLUDED.completed_at
            RETURNING *
            "#,
        )
        .bind(mark.id)
        .bind(mark.user_id)
        .bind(mark.resource_id)
        .bind(now)
        .bind(mark.created_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_saved_resources(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<UserResource>> {
        Ok(sqlx::query_as::<_, UserResource>(
            r#"
            SELECT * FROM user_resources
            WHERE user_id = $1 AND saved_at IS NOT NULL
            ORDER BY saved_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}
