use crate::errors::AppError;
use crate::models::checkin::CheckInResponses;

const SCORE_RANGE: std::ops::RangeInclusive<i32> = 1..=5;
const MAX_CHALLENGE_LEN: usize = 2000;
const MAX_SUPPORT_NEEDS: usize = 20;
const MAX_SUPPORT_NEED_LEN: usize = 200;

/// Rejects malformed check-ins before anything is written.
pub fn validate_check_in(week_number: i32, responses: &CheckInResponses) -> Result<(), AppError> {
    if week_number < 1 {
        return Err(AppError::Validation(
            "week_number must be a positive integer".to_string(),
        ));
    }

    for (name, score) in [
        ("confidence", responses.confidence),
        ("emotional_wellbeing", responses.emotional_wellbeing),
        ("work_readiness", responses.work_readiness),
    ] {
        if let Some(value) = score {
            if !SCORE_RANGE.contains(&value) {
                return Err(AppError::Validation(format!(
                    "{name} must be between 1 and 5, got {value}"
                )));
            }
        }
    }

    if responses.support_needs.len() > MAX_SUPPORT_NEEDS {
        return Err(AppError::Validation(format!(
            "at most {MAX_SUPPORT_NEEDS} support_needs are allowed"
        )));
    }
    if responses
        .support_needs
        .iter()
        .any(|n| n.trim().is_empty() || n.chars().count() > MAX_SUPPORT_NEED_LEN)
    {
        return Err(AppError::Validation(format!(
            "support_needs entries must be non-empty and at most {MAX_SUPPORT_NEED_LEN} characters"
        )));
    }

    if responses
        .biggest_challenge
        .as_deref()
        .is_some_and(|c| c.chars().count() > MAX_CHALLENGE_LEN)
    {
        return Err(AppError::Validation(format!(
            "biggest_challenge must be at most {MAX_CHALLENGE_LEN} characters"
        )));
    }

    Ok(())
}
