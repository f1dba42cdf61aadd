use crate::config::METRICS;
use crate::types::{HistoryRow, MetricStats, MonthRef, StatsPreviewRow, Variability};
use crate::util::{average, format_goal, format_number, population_stdev};

/// Most recent prior years considered for one month.
pub const MAX_YEARS: usize = 4;

// Coefficient-of-variation cut-offs, used when the mean is positive.
const CV_CONSISTENT: f64 = 0.20;
const CV_MIXED: f64 = 0.45;

// Absolute-range cut-offs for a zero (or negative) mean. A tunable
// heuristic, not a guarantee.
const RANGE_CONSISTENT: f64 = 1.0;
const RANGE_MIXED: f64 = 3.0;

/// Trailing same-month statistics for one metric.
///
/// Only rows strictly before `target_year` count. An empty `chapter`
/// matches every chapter of the region. Duplicate rows for the same year
/// are all kept, so they weigh that year twice.
pub fn compute_metric_stats(
    rows: &[HistoryRow],
    region: &str,
    chapter: &str,
    metric_key: &str,
    month: u32,
    target_year: i32,
) -> MetricStats {
    let mut selected: Vec<&HistoryRow> = rows
        .iter()
        .filter(|r| r.region == region)
        .filter(|r| chapter.is_empty() || r.chapter == chapter)
        .filter(|r| r.metric_key == metric_key && r.month == month && r.year < target_year)
        .collect();
    selected.sort_by(|a, b| b.year.cmp(&a.year));
    selected.truncate(MAX_YEARS);

    if selected.is_empty() {
        return MetricStats {
            has_history: false,
            count_years: 0,
            avg: 0.0,
            min: 0.0,
            max: 0.0,
            variability: Variability::Mixed,
            years: Vec::new(),
        };
    }

    let values: Vec<f64> = selected.iter().map(|r| r.value).collect();
    let avg = average(&values);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    MetricStats {
        has_history: true,
        count_years: values.len(),
        // Clamp away float drift so min <= avg <= max always holds.
        avg: avg.clamp(min, max),
        min,
        max,
        variability: classify(&values, avg, min, max),
        years: selected.iter().map(|r| r.year).collect(),
    }
}

fn classify(values: &[f64], avg: f64, min: f64, max: f64) -> Variability {
    if avg > 0.0 {
        let cv = population_stdev(values) / avg;
        if cv < CV_CONSISTENT {
            Variability::Consistent
        } else if cv < CV_MIXED {
            Variability::Mixed
        } else {
            Variability::Volatile
        }
    } else {
        let range = max - min;
        if range <= RANGE_CONSISTENT {
            Variability::Consistent
        } else if range <= RANGE_MIXED {
            Variability::Mixed
        } else {
            Variability::Volatile
        }
    }
}

/// Suggested goal for an average: nearest integer, never below zero.
pub fn round_goal(avg: f64) -> f64 {
    let r = avg.round();
    if r > 0.0 {
        r
    } else {
        0.0
    }
}

/// One preview row per configured metric for a target month.
pub fn metric_stats_table(
    rows: &[HistoryRow],
    region: &str,
    chapter: &str,
    month: &MonthRef,
) -> Vec<StatsPreviewRow> {
    METRICS
        .iter()
        .map(|m| {
            let s = compute_metric_stats(rows, region, chapter, m.key, month.month, month.year);
            if !s.has_history {
                return StatsPreviewRow {
                    metric: m.label.to_string(),
                    years: "0".to_string(),
                    avg: "-".to_string(),
                    min: "-".to_string(),
                    max: "-".to_string(),
                    variability: "No history".to_string(),
                    suggested: "-".to_string(),
                };
            }
            let years: Vec<String> = s.years.iter().map(|y| y.to_string()).collect();
            StatsPreviewRow {
                metric: m.label.to_string(),
                years: format!("{} ({})", s.count_years, years.join(", ")),
                avg: format_number(s.avg, 1),
                min: format_goal(s.min),
                max: format_goal(s.max),
                variability: s.variability.to_string(),
                suggested: format_goal(round_goal(s.avg)),
            }
        })
        .collect()
}
