use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::checkin::CheckInResponses;
use crate::models::snapshot::{ProgressSnapshot, WeeklyScore};

/// Percentage change of `current` against `baseline`, rounded half-up.
/// A zero baseline yields 0 rather than an error.
pub fn delta(current: i32, baseline: i32) -> i32 {
    if baseline == 0 {
        return 0;
    }
    let pct = (f64::from(current) - f64::from(baseline)) / f64::from(baseline) * 100.0;
    (pct + 0.5).floor() as i32
}

/// Folds one week's answers into the user's snapshot.
///
/// The week's entry is replaced or inserted, the list re-sorted by week, current
/// values taken from the highest week and all deltas recomputed against the lowest
/// week. Because the baseline is always the earliest week present, a late-arriving
/// early week changes every delta.
pub fn update_snapshot(
    existing: Option<ProgressSnapshot>,
    user_id: Uuid,
    week_number: i32,
    responses: &CheckInResponses,
    now: DateTime<Utc>,
) -> ProgressSnapshot {
    let mut snapshot = existing.unwrap_or_else(|| ProgressSnapshot::empty(user_id, now));

    let score = WeeklyScore {
        week: week_number,
        confidence: responses.confidence.unwrap_or(0),
        work_readiness: responses.work_readiness.unwrap_or(0),
        emotional_wellbeing: responses.emotional_wellbeing.unwrap_or(0),
        recorded_at: now,
    };

    match snapshot
        .weekly_scores
        .iter_mut()
        .find(|s| s.week == week_number)
    {
        Some(slot) => *slot = score,
        None => snapshot.weekly_scores.push(score),
    }
    snapshot.weekly_scores.sort_by_key(|s| s.week);

    recompute(&mut snapshot);
    snapshot.last_updated = now;
    snapshot
}

fn recompute(snapshot: &mut ProgressSnapshot) {
    let (Some(baseline), Some(latest)) = (
        snapshot.weekly_scores.first().cloned(),
        snapshot.weekly_scores.last().cloned(),
    ) else {
        return;
    };

    snapshot.current_confidence = latest.confidence;
    snapshot.current_wellbeing = latest.emotional_wellbeing;
    snapshot.current_work_readiness = latest.work_readiness;

    if snapshot.weekly_scores.len() > 1 {
        snapshot.confidence_delta = delta(latest.confidence, baseline.confidence);
        snapshot.wellbeing_delta = delta(latest.emotional_wellbeing, baseline.emotional_wellbeing);
        snapshot.work_readiness_delta = delta(latest.work_readiness, baseline.work_readiness);
    } else {
        snapshot.confidence_delta = 0;
        snapshot.wellbeing_delta = 0;
        snapshot.work_readiness_delta = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(confidence: i32, wellbeing: i32, readiness: i32) -> CheckInResponses {
        CheckInResponses {
            confidence: Some(confidence),
            emotional_wellbeing: Some(wellbeing),
            work_readiness: Some(readiness),
            ..Default::default()
        }
    }

    #[test]
    fn test_delta_doubling() {
        assert_eq!(delta(4, 2), 100);
    }

    #[test]
    fn test_delta_decline() {
        assert_eq!(delta(2, 4), -50);
    }

    #[test]
    fn test_delta_rounds() {
        // 1/3 → 33.33%, 2/3 → 66.67%
        assert_eq!(delta(4, 3), 33);
        assert_eq!(delta(5, 3), 67);
        assert_eq!(delta(2, 3), -33);
    }

    #[test]
    fn test_delta_zero_baseline() {
        assert_eq!(delta(5, 0), 0);
    }

    #[test]
    fn test_first_week_has_zero_deltas() {
        let user = Uuid::new_v4();
        let s = update_snapshot(None, user, 1, &answers(2, 3, 4), Utc::now());
        assert_eq!(s.weekly_scores.len(), 1);
        assert_eq!(s.current_confidence, 2);
        assert_eq!(s.current_wellbeing, 3);
        assert_eq!(s.current_work_readiness, 4);
        assert_eq!(
            (s.confidence_delta, s.wellbeing_delta, s.work_readiness_delta),
            (0, 0, 0)
        );
    }

    #[test]
    fn test_delta_against_earliest_week() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let s = update_snapshot(None, user, 1, &answers(2, 4, 2), now);
        let s = update_snapshot(Some(s), user, 3, &answers(4, 3, 3), now);
        assert_eq!(s.confidence_delta, 100);
        assert_eq!(s.wellbeing_delta, -25);
        assert_eq!(s.work_readiness_delta, 50);
    }

    #[test]
    fn test_out_of_order_week_resorts_and_rebaselines() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let s = update_snapshot(None, user, 5, &answers(4, 4, 4), now);
        let s = update_snapshot(Some(s), user, 2, &answers(2, 2, 2), now);

        let weeks: Vec<i32> = s.weekly_scores.iter().map(|w| w.week).collect();
        assert_eq!(weeks, vec![2, 5]);
        // current values follow the highest week, not insertion order
        assert_eq!(s.current_confidence, 4);
        assert_eq!(s.confidence_delta, 100);
    }

    #[test]
    fn test_same_week_overwrites() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let s = update_snapshot(None, user, 1, &answers(1, 1, 1), now);
        let s = update_snapshot(Some(s), user, 2, &answers(2, 2, 2), now);
        let s = update_snapshot(Some(s), user, 2, &answers(3, 3, 3), now);
        assert_eq!(s.weekly_scores.len(), 2);
        assert_eq!(s.current_confidence, 3);
        assert_eq!(s.confidence_delta, 200);
    }

    #[test]
    fn test_missing_scores_count_as_zero() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let s = update_snapshot(None, user, 1, &CheckInResponses::default(), now);
        let s = update_snapshot(Some(s), user, 2, &answers(3, 3, 3), now);
        assert_eq!(s.weekly_scores[0].confidence, 0);
        assert_eq!(s.confidence_delta, 0);
    }
}
