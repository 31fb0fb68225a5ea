//! In-process store used by the unit tests. Mirrors the semantics of the SQL
//! statements in `postgres.rs`, including the compare-and-swap paths.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::checkin::CheckIn;
use crate::models::goal::{Goal, GoalCategory};
use crate::models::recommendation::RecommendationBatch;
use crate::models::resource::{Resource, UserResource};
use crate::models::snapshot::ProgressSnapshot;
use crate::models::user::User;
use crate::store::{Page, Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    check_ins: Vec<CheckIn>,
    snapshots: HashMap<Uuid, ProgressSnapshot>,
    goals: Vec<Goal>,
    batches: Vec<RecommendationBatch>,
    resources: Vec<Resource>,
    user_resources: Vec<UserResource>,
    users: Vec<User>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_goals: Mutex<HashSet<Uuid>>,
    fail_goal_inserts: Mutex<bool>,
    failing_snapshot_writes: Mutex<u32>,
    contended_snapshot_writes: Mutex<u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_resources(&self, resources: Vec<Resource>) {
        self.tables.lock().unwrap().resources.extend(resources);
    }

    pub fn seed_user(&self, user: User) {
        self.tables.lock().unwrap().users.push(user);
    }

    /// Stores a check-in without touching the snapshot.
    pub fn seed_check_in(&self, check_in: CheckIn) {
        self.tables.lock().unwrap().check_ins.push(check_in);
    }

    /// Makes every write to the given goal fail with a database error.
    pub fn fail_writes_for_goal(&self, id: Uuid) {
        self.failing_goals.lock().unwrap().insert(id);
    }

    pub fn fail_goal_inserts(&self) {
        *self.fail_goal_inserts.lock().unwrap() = true;
    }

    /// Fails the next `n` check-in recordings after the snapshot compare-and-swap
    /// has passed, as a dropped connection mid-transaction would.
    pub fn fail_next_snapshot_writes(&self, n: u32) {
        *self.failing_snapshot_writes.lock().unwrap() = n;
    }

    /// Lets another writer bump the stored snapshot's version just before each of
    /// the next `n` compare-and-swaps.
    pub fn contend_snapshot_writes(&self, n: u32) {
        *self.contended_snapshot_writes.lock().unwrap() = n;
    }

    pub fn snapshot_count(&self) -> usize {
        self.tables.lock().unwrap().snapshots.len()
    }

    pub fn batch_count(&self) -> usize {
        self.tables.lock().unwrap().batches.len()
    }

    fn goal_write_fails(&self, id: Uuid) -> bool {
        self.failing_goals.lock().unwrap().contains(&id)
    }

    fn user_resource<'a>(
        t: &'a mut Tables,
        user_id: Uuid,
        resource_id: Uuid,
        now: DateTime<Utc>,
    ) -> &'a mut UserResource {
        let pos = match t
            .user_resources
            .iter()
            .position(|m| m.user_id == user_id && m.resource_id == resource_id)
        {
            Some(pos) => pos,
            None => {
                t.user_resources
                    .push(UserResource::new(user_id, resource_id, now));
                t.user_resources.len() - 1
            }
        };
        &mut t.user_resources[pos]
    }
}

/// Consumes one unit of an injection budget.
fn take(budget: &Mutex<u32>) -> bool {
    let mut left = budget.lock().unwrap();
    if *left == 0 {
        return false;
    }
    *left -= 1;
    true
}

fn page_of<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    rows.into_iter()
        .skip(usize::try_from(page.offset).unwrap_or(0))
        .take(usize::try_from(page.limit).unwrap_or(0))
        .collect()
}

fn injected_failure() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

fn mark_completed(goal: &mut Goal, now: DateTime<Utc>) {
    goal.is_completed = true;
    if goal.completed_at.is_none() {
        goal.completed_at = Some(now);
    }
}

fn record_progress(goal: &mut Goal, now: DateTime<Utc>) {
    goal.current_count += 1;
    if goal.current_count >= goal.target_count {
        mark_completed(goal, now);
    }
}

fn complete(goal: &mut Goal, now: DateTime<Utc>) {
    goal.current_count = goal.target_count;
    mark_completed(goal, now);
}

#[async_trait]
impl Store for MemoryStore {
    async fn record_check_in(
        &self,
        check_in: &CheckIn,
        snapshot: &ProgressSnapshot,
        expected_version: Option<i64>,
    ) -> StoreResult<bool> {
        let mut t = self.tables.lock().unwrap();
        if t.check_ins
            .iter()
            .any(|c| c.user_id == check_in.user_id && c.week_number == check_in.week_number)
        {
            return Err(StoreError::Duplicate(format!(
                "Check-in for week {} already exists",
                check_in.week_number
            )));
        }

        if take(&self.contended_snapshot_writes) {
            if let Some(s) = t.snapshots.get_mut(&snapshot.user_id) {
                s.version += 1;
            }
        }
        let current = t.snapshots.get(&snapshot.user_id).map(|s| s.version);
        if current != expected_version {
            return Ok(false);
        }
        if take(&self.failing_snapshot_writes) {
            return Err(injected_failure());
        }

        t.check_ins.push(check_in.clone());
        t.snapshots.insert(snapshot.user_id, snapshot.clone());
        Ok(true)
    }

    async fn find_check_in(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<CheckIn>> {
        let t = self.tables.lock().unwrap();
        Ok(t.check_ins
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned())
    }

    async fn find_check_in_for_week(
        &self,
        user_id: Uuid,
        week_number: i32,
    ) -> StoreResult<Option<CheckIn>> {
        let t = self.tables.lock().unwrap();
        Ok(t.check_ins
            .iter()
            .find(|c| c.user_id == user_id && c.week_number == week_number)
            .cloned())
    }

    async fn list_check_ins(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<CheckIn>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .check_ins
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.week_number);
        Ok(page_of(rows, page))
    }

    async fn recent_check_ins(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<CheckIn>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .check_ins
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.week_number.cmp(&a.week_number));
        Ok(page_of(rows, Page { limit, offset: 0 }))
    }

    async fn count_check_ins(&self, user_id: Uuid) -> StoreResult<i64> {
        let t = self.tables.lock().unwrap();
        Ok(t.check_ins.iter().filter(|c| c.user_id == user_id).count() as i64)
    }

    async fn find_snapshot(&self, user_id: Uuid) -> StoreResult<Option<ProgressSnapshot>> {
        Ok(self.tables.lock().unwrap().snapshots.get(&user_id).cloned())
    }

    async fn list_goals(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Goal>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .goals
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page_of(rows, page))
    }

    async fn list_open_goals(
        &self,
        user_id: Uuid,
        category: GoalCategory,
    ) -> StoreResult<Vec<Goal>> {
        let t = self.tables.lock().unwrap();
        Ok(t.goals
            .iter()
            .filter(|g| g.user_id == user_id && g.category == category && !g.is_completed)
            .cloned()
            .collect())
    }

    async fn list_open_suggestions(&self, user_id: Uuid) -> StoreResult<Vec<Goal>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .goals
            .iter()
            .filter(|g| g.user_id == user_id && g.is_suggested && !g.is_completed)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Goal>> {
        let t = self.tables.lock().unwrap();
        Ok(t.goals
            .iter()
            .find(|g| g.id == id && g.user_id == user_id)
            .cloned())
    }

    async fn insert_goals(&self, goals: &[Goal]) -> StoreResult<()> {
        if *self.fail_goal_inserts.lock().unwrap() {
            return Err(injected_failure());
        }
        self.tables.lock().unwrap().goals.extend_from_slice(goals);
        Ok(())
    }

    async fn advance_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Goal>> {
        if self.goal_write_fails(id) {
            return Err(injected_failure());
        }
        let mut t = self.tables.lock().unwrap();
        Ok(t.goals
            .iter_mut()
            .find(|g| g.id == id && g.user_id == user_id)
            .map(|g| {
                record_progress(g, now);
                g.clone()
            }))
    }

    async fn complete_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Goal>> {
        if self.goal_write_fails(id) {
            return Err(injected_failure());
        }
        let mut t = self.tables.lock().unwrap();
        Ok(t.goals
            .iter_mut()
            .find(|g| g.id == id && g.user_id == user_id)
            .map(|g| {
                complete(g, now);
                g.clone()
            }))
    }

    async fn delete_goal(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.goals.len();
        t.goals.retain(|g| !(g.id == id && g.user_id == user_id));
        Ok(t.goals.len() != before)
    }

    async fn latest_recommendation(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Option<RecommendationBatch>> {
        let t = self.tables.lock().unwrap();
        Ok(t.batches
            .iter()
            .filter(|b| b.user_id == user_id)
            .max_by_key(|b| b.generated_at)
            .cloned())
    }

    async fn insert_recommendation_if_allowed(
        &self,
        batch: &RecommendationBatch,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut t = self.tables.lock().unwrap();
        if t.batches
            .iter()
            .any(|b| b.user_id == batch.user_id && b.next_allowed_at > now)
        {
            return Ok(false);
        }
        t.batches.push(batch.clone());
        Ok(true)
    }

    async fn list_resources(&self) -> StoreResult<Vec<Resource>> {
        let mut rows = self.tables.lock().unwrap().resources.clone();
        rows.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(rows)
    }

    async fn find_resources(&self, ids: &[Uuid]) -> StoreResult<Vec<Resource>> {
        let t = self.tables.lock().unwrap();
        Ok(t.resources
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn save_resource(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<UserResource> {
        let mut t = self.tables.lock().unwrap();
        let mark = Self::user_resource(&mut t, user_id, resource_id, now);
        mark.saved_at = Some(now);
        Ok(mark.clone())
    }

    async fn complete_resource(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<UserResource> {
        let mut t = self.tables.lock().unwrap();
        let mark = Self::user_resource(&mut t, user_id, resource_id, now);
        mark.completed_at = Some(now);
        Ok(mark.clone())
    }

    async fn list_saved_resources(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> StoreResult<Vec<UserResource>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<_> = t
            .user_resources
            .iter()
            .filter(|m| m.user_id == user_id && m.saved_at.is_some())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(page_of(rows, page))
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.id == user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn engagement_goal(user_id: Uuid, target: i32) -> Goal {
        Goal::new(
            user_id,
            "Check in twice",
            GoalCategory::Engagement,
            target,
            None,
            false,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_progress_completes_at_target() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let goal = engagement_goal(user, 2);
        store.insert_goals(&[goal.clone()]).await.unwrap();
        let now = Utc::now();

        let g = store.advance_goal(user, goal.id, now).await.unwrap().unwrap();
        assert!(!g.is_completed);
        let g = store.advance_goal(user, goal.id, now).await.unwrap().unwrap();
        assert!(g.is_completed);
        assert_eq!(g.completed_at, Some(now));
    }

    #[tokio::test]
    async fn test_completed_at_is_never_restamped() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let goal = engagement_goal(user, 1);
        store.insert_goals(&[goal.clone()]).await.unwrap();
        let first = Utc::now();

        store.advance_goal(user, goal.id, first).await.unwrap();
        store
            .advance_goal(user, goal.id, first + Duration::days(3))
            .await
            .unwrap();
        let g = store
            .complete_goal(user, goal.id, first + Duration::days(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(g.completed_at, Some(first));
        assert_eq!(g.current_count, 1);
    }

    #[tokio::test]
    async fn test_complete_fills_counter() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let goal = engagement_goal(user, 4);
        store.insert_goals(&[goal.clone()]).await.unwrap();

        store.advance_goal(user, goal.id, Utc::now()).await.unwrap();
        let g = store
            .complete_goal(user, goal.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(g.current_count, 4);
        assert!(g.is_completed);
    }

    #[tokio::test]
    async fn test_other_users_goal_is_invisible() {
        let store = MemoryStore::new();
        let goal = engagement_goal(Uuid::new_v4(), 1);
        store.insert_goals(&[goal.clone()]).await.unwrap();

        let stranger = Uuid::new_v4();
        assert!(store.advance_goal(stranger, goal.id, Utc::now()).await.unwrap().is_none());
        assert!(!store.delete_goal(stranger, goal.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_suggestions_newest_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let start = Utc::now();
        let suggestion = |title: &str, at| {
            Goal::new(user, title, GoalCategory::Learning, 1, None, true, at)
        };
        let older = suggestion("Read one guide", start);
        let newer = suggestion("Watch one video", start + Duration::days(7));
        store.insert_goals(&[older.clone(), newer.clone()]).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_open_suggestions(user)
            .await
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_goal_pages() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let start = Utc::now();
        let goals: Vec<Goal> = (0..3)
            .map(|i| {
                Goal::new(
                    user,
                    "Walk",
                    GoalCategory::Personal,
                    1,
                    None,
                    false,
                    start + Duration::days(i),
                )
            })
            .collect();
        store.insert_goals(&goals).await.unwrap();

        let second = store
            .list_goals(user, Page { limit: 2, offset: 2 })
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, goals[0].id);
    }

    #[tokio::test]
    async fn test_resource_marks_share_one_row() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let resource = Uuid::new_v4();
        let saved_at = Utc::now();

        let saved = store.save_resource(user, resource, saved_at).await.unwrap();
        let done = store
            .complete_resource(user, resource, saved_at + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(saved.id, done.id);
        assert_eq!(done.saved_at, Some(saved_at));

        let page = Page { limit: 10, offset: 0 };
        assert_eq!(store.list_saved_resources(user, page).await.unwrap(), vec![done]);
        assert!(store
            .list_saved_resources(Uuid::new_v4(), page)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_completed_only_mark_is_not_saved() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store
            .complete_resource(user, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        let page = Page { limit: 10, offset: 0 };
        assert!(store.list_saved_resources(user, page).await.unwrap().is_empty());
    }
}
