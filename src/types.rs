use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tabled::Tabled;

/// One observed value of a metric for a (region, chapter, year, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub region: String,
    pub chapter: String,
    pub metric_key: String,
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

/// One past event, shown as context next to the goal prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub region: String,
    pub chapter: String,
    pub year: i32,
    pub month: u32,
    pub event_name: String,
    pub events: f64,
    pub new_teens: f64,
    pub avg_attendance: f64,
    pub retention_contacts: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricConfig {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub unit_label: &'static str,
    pub goal_min: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRef {
    /// `YYYY-MM`
    pub key: String,
    pub year: i32,
    pub month: u32,
    /// `March 2025`
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricDraft {
    pub goal_value: Option<f64>,
    pub reasons: BTreeSet<String>,
    pub note: String,
}

/// month key -> metric key -> draft
pub type GoalsByMonth = BTreeMap<String, BTreeMap<String, MetricDraft>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub staff_name: String,
    pub last_region: String,
    pub last_chapter: String,
}

/// Who a submission (and its draft) belongs to. An empty chapter means
/// region-wide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub region: String,
    pub chapter: String,
    pub staff: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variability {
    Consistent,
    Mixed,
    Volatile,
}

impl fmt::Display for Variability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Consistent => "Consistent",
            Self::Mixed => "Mixed",
            Self::Volatile => "Volatile",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub has_history: bool,
    pub count_years: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub variability: Variability,
    /// Years of the selected rows, most recent first.
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSubmission {
    pub goal: f64,
    pub reasons: Vec<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub submission_id: String,
    pub created_at_iso: String,
    pub region: String,
    pub chapter: String,
    pub staff: String,
    pub months: Vec<String>,
    pub metrics_by_month: BTreeMap<String, BTreeMap<String, MetricSubmission>>,
    pub app_version: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct StatsPreviewRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Years")]
    pub years: String,
    #[tabled(rename = "Avg")]
    pub avg: String,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Max")]
    pub max: String,
    #[tabled(rename = "Variability")]
    pub variability: String,
    #[tabled(rename = "Suggested")]
    pub suggested: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct EventPreviewRow {
    #[tabled(rename = "Year")]
    pub year: i32,
    #[tabled(rename = "Event")]
    pub event_name: String,
    #[tabled(rename = "Events")]
    pub events: String,
    #[tabled(rename = "NewTeens")]
    pub new_teens: String,
    #[tabled(rename = "AvgAttendance")]
    pub avg_attendance: String,
    #[tabled(rename = "Retention")]
    pub retention_contacts: String,
}
