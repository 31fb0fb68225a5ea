use crate::models::snapshot::ProgressSnapshot;

pub const KEEP_CHECKING_IN: &str = "You've started tracking your progress. Keep checking in!";

type InsightRule = fn(&ProgressSnapshot) -> Option<String>;

/// Evaluated in order. Each rule is an independent check on the snapshot; the
/// two wellbeing ranges are disjoint, so at most one of them fires.
static RULES: [InsightRule; 4] = [
    confidence_trend,
    steady_wellbeing,
    improved_wellbeing,
    peak_readiness,
];

fn confidence_trend(s: &ProgressSnapshot) -> Option<String> {
    let d = s.confidence_delta;
    if d >= 50 {
        Some(format!(
            "Your confidence has increased by {d}% over the past weeks."
        ))
    } else if d > 0 {
        Some(format!("Your confidence has increased by {d}%. Keep it up!"))
    } else if d < 0 {
        Some("It's natural to have variations in confidence. Focus on small wins.".to_string())
    } else {
        None
    }
}

fn steady_wellbeing(s: &ProgressSnapshot) -> Option<String> {
    (s.wellbeing_delta > -10 && s.wellbeing_delta < 10 && s.weekly_scores.len() > 1)
        .then(|| "You're showing steady progress in emotional wellbeing.".to_string())
}

fn improved_wellbeing(s: &ProgressSnapshot) -> Option<String> {
    (s.wellbeing_delta >= 20)
        .then(|| "Great job! Your emotional wellbeing has improved significantly.".to_string())
}

fn peak_readiness(s: &ProgressSnapshot) -> Option<String> {
    (f64::from(s.current_work_readiness) >= 4.5)
        .then(|| "Your work readiness score is at an all-time high.".to_string())
}

/// Short, deterministic insights derived from a snapshot.
///
/// Yields nothing for a missing snapshot. When no rule fires but at least one
/// week is recorded, yields a single encouragement message instead.
pub fn key_insights(snapshot: Option<&ProgressSnapshot>) -> impl Iterator<Item = String> + '_ {
    snapshot.into_iter().flat_map(|s| {
        let mut fired = RULES.iter().filter_map(move |rule| rule(s)).peekable();
        let fallback = (fired.peek().is_none() && !s.weekly_scores.is_empty())
            .then(|| KEEP_CHECKING_IN.to_string());
        fired.chain(fallback)
    })
}
