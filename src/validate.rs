// Authoring-time gate for the data files: same row rules as the runtime
// loader, but every problem is collected and reported.
use crate::config::{METRICS, METRIC_KEYS};
use crate::loader::{read_text, validate_events_csv, validate_history_csv, RowError};
use serde::Serialize;
use std::path::Path;

pub const EXPECTED_METRIC_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub file: String,
    pub line: usize,
    pub reason: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.reason)
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub history_rows: usize,
    pub event_rows: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

fn push_row_errors(issues: &mut Vec<ValidationIssue>, file: &Path, errors: Vec<RowError>) {
    let file = file.display().to_string();
    issues.extend(errors.into_iter().map(|e| ValidationIssue {
        file: file.clone(),
        line: e.line,
        reason: e.issue.to_string(),
    }));
}

pub fn check_metric_set() -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if METRICS.len() != EXPECTED_METRIC_COUNT || METRIC_KEYS.len() != METRICS.len() {
        issues.push(ValidationIssue {
            file: "<metrics>".to_string(),
            line: 0,
            reason: format!(
                "expected {} unique metric keys, found {} ({} unique)",
                EXPECTED_METRIC_COUNT,
                METRICS.len(),
                METRIC_KEYS.len()
            ),
        });
    }
    issues
}

/// Validate both files; read failures count as issues at line 0.
pub fn validate_files(history: &Path, events: &Path) -> ValidationReport {
    let mut report = ValidationReport { issues: check_metric_set(), ..Default::default() };

    match read_text(history) {
        Ok(text) => match validate_history_csv(&text) {
            Ok(rows) => report.history_rows = rows.len(),
            Err(errors) => push_row_errors(&mut report.issues, history, errors),
        },
        Err(e) => report.issues.push(ValidationIssue {
            file: history.display().to_string(),
            line: 0,
            reason: e.to_string(),
        }),
    }

    match read_text(events) {
        Ok(text) => match validate_events_csv(&text) {
            Ok(rows) => report.event_rows = rows.len(),
            Err(errors) => push_row_errors(&mut report.issues, events, errors),
        },
        Err(e) => report.issues.push(ValidationIssue {
            file: events.display().to_string(),
            line: 0,
            reason: e.to_string(),
        }),
    }
    report
}
