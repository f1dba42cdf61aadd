use crate::config::{metric_config, METRICS};
use crate::stats::{compute_metric_stats, round_goal};
use crate::types::{GoalsByMonth, HistoryRow, MetricDraft, MonthRef};
use crate::util::format_goal;
use std::collections::BTreeMap;
use std::fmt;

/// An inline input problem for one goal field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub month: String,
    pub metric: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = metric_config(&self.metric).map(|m| m.label).unwrap_or(self.metric.as_str());
        write!(f, "{} / {}: {}", self.month, label, self.message)
    }
}

pub fn empty_goals(months: &[MonthRef]) -> GoalsByMonth {
    months
        .iter()
        .map(|m| {
            let metrics = METRICS.iter().map(|c| (c.key.to_string(), MetricDraft::default())).collect();
            (m.key.clone(), metrics)
        })
        .collect()
}

/// Reshape `goals` to exactly the window's months and the configured
/// metrics, keeping whatever drafts already match.
pub fn normalize_goals(mut goals: GoalsByMonth, months: &[MonthRef]) -> GoalsByMonth {
    months
        .iter()
        .map(|m| {
            let mut existing = goals.remove(&m.key).unwrap_or_default();
            let metrics: BTreeMap<String, MetricDraft> = METRICS
                .iter()
                .map(|c| (c.key.to_string(), existing.remove(c.key).unwrap_or_default()))
                .collect();
            (m.key.clone(), metrics)
        })
        .collect()
}

/// Fresh goals with each value suggested from history, or left empty where
/// there is none.
pub fn prefill_goals(history: &[HistoryRow], region: &str, chapter: &str, months: &[MonthRef]) -> GoalsByMonth {
    let mut goals = empty_goals(months);
    for m in months {
        let Some(metrics) = goals.get_mut(&m.key) else { continue };
        for c in METRICS.iter() {
            let stats = compute_metric_stats(history, region, chapter, c.key, m.month, m.year);
            if let Some(draft) = metrics.get_mut(c.key) {
                draft.goal_value = stats.has_history.then(|| round_goal(stats.avg));
            }
        }
    }
    goals
}

pub fn validate_goals(goals: &GoalsByMonth, months: &[MonthRef]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for m in months {
        for c in METRICS.iter() {
            let value = goals.get(&m.key).and_then(|g| g.get(c.key)).and_then(|d| d.goal_value);
            let message = match value {
                None => "a goal is required".to_string(),
                Some(v) if !v.is_finite() => "goal must be a number".to_string(),
                Some(v) if v < c.goal_min => format!("goal must be at least {}", format_goal(c.goal_min)),
                Some(_) => continue,
            };
            errors.push(FieldError { month: m.key.clone(), metric: c.key.to_string(), message });
        }
    }
    errors
}
