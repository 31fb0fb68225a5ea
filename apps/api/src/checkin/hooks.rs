//! Best-effort enrichments that run after a check-in is durably stored.
//!
//! Hooks run in order, each inside its own error boundary: a failing hook is
//! logged and skipped, and never fails the check-in submission.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::goals::progression::advance_engagement_goals;
use crate::goals::suggestions::generate_suggestions;
use crate::models::checkin::CheckIn;
use crate::store::Store;

#[async_trait]
pub trait PostCommitHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        store: &dyn Store,
        check_in: &CheckIn,
        now: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

pub type HookList = Arc<[Arc<dyn PostCommitHook>]>;

/// Counts the check-in towards open engagement goals.
pub struct EngagementGoalProgression;

#[async_trait]
impl PostCommitHook for EngagementGoalProgression {
    fn name(&self) -> &'static str {
        "engagement_goal_progression"
    }

    async fn run(
        &self,
        store: &dyn Store,
        check_in: &CheckIn,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let summary = advance_engagement_goals(store, check_in.user_id, now).await?;
        debug!(
            "Goal progression for check-in {}: {:?}",
            check_in.id, summary
        );
        Ok(())
    }
}

/// Stores follow-up goal suggestions derived from the answers.
pub struct GoalSuggestions;

#[async_trait]
impl PostCommitHook for GoalSuggestions {
    fn name(&self) -> &'static str {
        "goal_suggestions"
    }

    async fn run(
        &self,
        store: &dyn Store,
        check_in: &CheckIn,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        generate_suggestions(store, check_in.user_id, &check_in.responses, now).await?;
        Ok(())
    }
}

/// Progression runs before suggestions so a freshly suggested engagement goal
/// is not advanced by the check-in that created it.
pub fn default_hooks() -> HookList {
    Arc::new([
        Arc::new(EngagementGoalProgression) as Arc<dyn PostCommitHook>,
        Arc::new(GoalSuggestions),
    ])
}

pub async fn run_hooks(
    hooks: &[Arc<dyn PostCommitHook>],
    store: &dyn Store,
    check_in: &CheckIn,
    now: DateTime<Utc>,
) {
    for hook in hooks {
        if let Err(e) = hook.run(store, check_in, now).await {
            warn!(
                "Post-commit hook '{}' failed for check-in {}: {e}",
                hook.name(),
                check_in.id
            );
        }
    }
}
