use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::checkin::CheckIn;
use crate::models::snapshot::ProgressSnapshot;
use crate::progress::calculator::update_snapshot;
use crate::store::Store;

/// Attempts at the read-modify-write cycle before giving up on a contended snapshot.
const MAX_SAVE_ATTEMPTS: u32 = 5;

/// Result of the get-or-create step that starts every snapshot update.
#[derive(Debug)]
pub enum LoadedSnapshot {
    Found(ProgressSnapshot),
    Created(ProgressSnapshot),
}

impl LoadedSnapshot {
    fn expected_version(&self) -> Option<i64> {
        match self {
            LoadedSnapshot::Found(s) => Some(s.version),
            LoadedSnapshot::Created(_) => None,
        }
    }

    fn into_inner(self) -> ProgressSnapshot {
        match self {
            LoadedSnapshot::Found(s) | LoadedSnapshot::Created(s) => s,
        }
    }
}

pub async fn load_or_create(
    store: &dyn Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<LoadedSnapshot, AppError> {
    Ok(match store.find_snapshot(user_id).await? {
        Some(s) => LoadedSnapshot::Found(s),
        None => LoadedSnapshot::Created(ProgressSnapshot::empty(user_id, now)),
    })
}

/// Records a check-in together with the week's scores in the user's snapshot.
///
/// Both land in one store transaction, so a failed snapshot write never leaves
/// an orphaned check-in behind. Concurrent writers are resolved with optimistic
/// concurrency: the write only lands if the stored version is still the one that
/// was read, otherwise the snapshot is reloaded and the week re-applied.
pub async fn record_week(
    store: &dyn Store,
    check_in: &CheckIn,
    now: DateTime<Utc>,
) -> Result<ProgressSnapshot, AppError> {
    let user_id = check_in.user_id;
    for attempt in 1..=MAX_SAVE_ATTEMPTS {
        let loaded = load_or_create(store, user_id, now).await?;
        let expected = loaded.expected_version();
        if expected.is_none() {
            info!("Creating first progress snapshot for user {user_id}");
        }

        let mut next = update_snapshot(
            Some(loaded.into_inner()),
            user_id,
            check_in.week_number,
            &check_in.responses,
            now,
        );
        next.version = expected.map_or(1, |v| v + 1);

        if store.record_check_in(check_in, &next, expected).await? {
            debug!(
                "Snapshot for user {user_id} now v{} with {} weeks (deltas c={} w={} r={})",
                next.version,
                next.weekly_scores.len(),
                next.confidence_delta,
                next.wellbeing_delta,
                next.work_readiness_delta
            );
            return Ok(next);
        }

        warn!("Snapshot write for user {user_id} lost a race (attempt {attempt}), retrying");
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "Progress snapshot for user {user_id} is too contended to update"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checkin::{CheckInResponses, JourneyStage};
    use crate::store::MemoryStore;

    fn check_in(user_id: Uuid, week_number: i32, confidence: i32) -> CheckIn {
        CheckIn {
            id: Uuid::new_v4(),
            user_id,
            week_number,
            journey_stage: JourneyStage::Returning,
            responses: CheckInResponses {
                confidence: Some(confidence),
                emotional_wellbeing: Some(3),
                work_readiness: Some(3),
                ..Default::default()
            },
            completed_at: Utc::now(),
        }
    }

    fn weeks(snapshot: &ProgressSnapshot) -> Vec<i32> {
        snapshot.weekly_scores.iter().map(|w| w.week).collect()
    }

    #[tokio::test]
    async fn test_creates_then_updates() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let first = record_week(&store, &check_in(user, 1, 2), now).await.unwrap();
        assert_eq!(first.version, 1);

        let second = record_week(&store, &check_in(user, 3, 4), now).await.unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.confidence_delta, 100);
        assert_eq!(store.snapshot_count(), 1);
        assert_eq!(store.count_check_ins(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lost_race_reloads_and_reapplies() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let first = record_week(&store, &check_in(user, 1, 2), now).await.unwrap();

        store.contend_snapshot_writes(2);
        let next = record_week(&store, &check_in(user, 2, 3), now).await.unwrap();

        // Two foreign bumps plus this write.
        assert_eq!(next.version, first.version + 3);
        assert_eq!(weeks(&next), vec![1, 2]);
        let stored = store.find_snapshot(user).await.unwrap().unwrap();
        assert_eq!(stored, next);
        assert_eq!(store.count_check_ins(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_internal_error_and_write_nothing() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        record_week(&store, &check_in(user, 1, 2), now).await.unwrap();

        store.contend_snapshot_writes(MAX_SAVE_ATTEMPTS);
        let err = record_week(&store, &check_in(user, 2, 3), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.code(), "INTERNAL_ERROR");

        assert!(store.find_check_in_for_week(user, 2).await.unwrap().is_none());
        let stored = store.find_snapshot(user).await.unwrap().unwrap();
        assert_eq!(weeks(&stored), vec![1]);

        // The contention is gone, so the same week goes through.
        let next = record_week(&store, &check_in(user, 2, 3), now).await.unwrap();
        assert_eq!(weeks(&next), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_no_check_in() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.fail_next_snapshot_writes(1);

        let err = record_week(&store, &check_in(user, 1, 2), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert_eq!(store.count_check_ins(user).await.unwrap(), 0);
        assert_eq!(store.snapshot_count(), 0);
    }

    #[tokio::test]
    async fn test_load_or_create_tags_result() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        assert!(matches!(
            load_or_create(&store, user, now).await.unwrap(),
            LoadedSnapshot::Created(_)
        ));
        record_week(&store, &check_in(user, 1, 3), now).await.unwrap();
        assert!(matches!(
            load_or_create(&store, user, now).await.unwrap(),
            LoadedSnapshot::Found(_)
        ));
    }
}
