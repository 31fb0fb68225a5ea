use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::goal::GoalCategory;
use crate::store::Store;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgressionSummary {
    pub advanced: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Counts a check-in towards every open engagement goal of the user.
///
/// Each goal is written on its own. A failed write is logged and counted but
/// does not stop the remaining goals from advancing.
pub async fn advance_engagement_goals(
    store: &dyn Store,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ProgressionSummary, AppError> {
    let goals = store
        .list_open_goals(user_id, GoalCategory::Engagement)
        .await?;

    let mut summary = ProgressionSummary::default();
    for goal in goals {
        match store.advance_goal(user_id, goal.id, now).await {
            Ok(Some(updated)) => {
                summary.advanced += 1;
                if updated.is_completed {
                    summary.completed += 1;
                    info!("Engagement goal {} completed for user {user_id}", goal.id);
                }
            }
            Ok(None) => {
                // Deleted between listing and update.
                warn!("Engagement goal {} vanished before it could advance", goal.id);
            }
            Err(e) => {
                summary.failed += 1;
                warn!("Failed to advance engagement goal {}: {e}", goal.id);
            }
        }
    }

    Ok(summary)
}
