use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::checkin::CheckInResponses;
use crate::models::goal::{Goal, GoalCategory};
use crate::store::Store;

/// Suggested goals are due two weeks after the check-in that produced them.
const SUGGESTION_WINDOW_DAYS: i64 = 14;

struct Suggestion {
    title: &'static str,
    category: GoalCategory,
    target_count: i32,
}

static TEAM_CATCH_UP: Suggestion = Suggestion {
    title: "Schedule a catch-up coffee with a team member",
    category: GoalCategory::Community,
    target_count: 1,
};

static CAREER_REVIEW: Suggestion = Suggestion {
    title: "Review career progression materials",
    category: GoalCategory::Career,
    target_count: 1,
};

static CONFIDENCE_MODULE: Suggestion = Suggestion {
    title: "Complete a confidence-building micro-learning module",
    category: GoalCategory::Learning,
    target_count: 1,
};

static WELLNESS_CHECK_INS: Suggestion = Suggestion {
    title: "Complete 2 wellness check-ins this month",
    category: GoalCategory::Engagement,
    target_count: 2,
};

static LIBRARY_VISIT: Suggestion = Suggestion {
    title: "Check out the Resource Library for 10 minutes",
    category: GoalCategory::Learning,
    target_count: 1,
};

/// Picks follow-up goals from a check-in's answers.
///
/// Every rule is checked on its own, so several suggestions can come out of one
/// check-in. When nothing matches, the library visit is suggested.
fn select(responses: &CheckInResponses) -> Vec<&'static Suggestion> {
    let mut picked = Vec::new();

    if responses
        .biggest_challenge
        .as_deref()
        .is_some_and(|c| c.to_lowercase().contains("team"))
    {
        picked.push(&TEAM_CATCH_UP);
    }
    if responses
        .support_needs
        .iter()
        .any(|n| n.to_lowercase().contains("career"))
    {
        picked.push(&CAREER_REVIEW);
    }
    if responses.confidence.is_some_and(|c| c < 3) {
        picked.push(&CONFIDENCE_MODULE);
    }
    if responses.emotional_wellbeing.is_some_and(|w| w < 3) {
        picked.push(&WELLNESS_CHECK_INS);
    }
    if picked.is_empty() {
        picked.push(&LIBRARY_VISIT);
    }

    picked
}

/// Builds and stores suggested goals for a check-in.
///
/// Existing goals are not consulted: repeated check-ins that match the same rule
/// produce repeated suggestions.
pub async fn generate_suggestions(
    store: &dyn Store,
    user_id: Uuid,
    responses: &CheckInResponses,
    now: DateTime<Utc>,
) -> Result<Vec<Goal>, AppError> {
    let due_date = now + Duration::days(SUGGESTION_WINDOW_DAYS);
    let goals: Vec<Goal> = select(responses)
        .into_iter()
        .map(|s| {
            Goal::new(
                user_id,
                s.title,
                s.category,
                s.target_count,
                Some(due_date),
                true,
                now,
            )
        })
        .collect();

    store.insert_goals(&goals).await?;
    info!("Suggested {} goal(s) for user {user_id}", goals.len());
    Ok(goals)
}
