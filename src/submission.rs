// Submission payload plus its text renderings, filename and receipt.
use crate::config::{metric_config, METRICS};
use crate::errors::{AppError, AppResult};
use crate::months::{window_key, window_label};
use crate::types::{GoalsByMonth, Identity, MetricSubmission, MonthRef, SubmissionPayload};
use crate::util::format_goal;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Separates the human-readable text from the JSON payload.
pub const MACHINE_MARKER: &str = "----- GOALS_JSON -----";

pub const CHAPTER_FALLBACK: &str = "All chapters";
const FILENAME_CHAPTER_FALLBACK: &str = "AllChapters";
const FILENAME_EMPTY_TOKEN: &str = "NA";
const FILENAME_PART_MAX: usize = 40;

pub fn build_payload(
    months: &[MonthRef],
    goals: &GoalsByMonth,
    identity: &Identity,
    app_version: &str,
) -> SubmissionPayload {
    build_payload_at(months, goals, identity, app_version, Utc::now())
}

pub fn build_payload_at(
    months: &[MonthRef],
    goals: &GoalsByMonth,
    identity: &Identity,
    app_version: &str,
    now: DateTime<Utc>,
) -> SubmissionPayload {
    let metrics_by_month = months
        .iter()
        .map(|m| {
            let month_goals = goals.get(&m.key);
            let metrics: BTreeMap<String, MetricSubmission> = METRICS
                .iter()
                .map(|c| {
                    let draft = month_goals.and_then(|g| g.get(c.key));
                    let entry = MetricSubmission {
                        goal: draft.and_then(|d| d.goal_value).unwrap_or(0.0),
                        reasons: draft.map(|d| d.reasons.iter().cloned().collect()).unwrap_or_default(),
                        note: draft.map(|d| d.note.trim().to_string()).unwrap_or_default(),
                    };
                    (c.key.to_string(), entry)
                })
                .collect();
            (m.key.clone(), metrics)
        })
        .collect();

    SubmissionPayload {
        submission_id: Uuid::new_v4().to_string(),
        created_at_iso: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        region: identity.region.trim().to_string(),
        chapter: identity.chapter.trim().to_string(),
        staff: identity.staff.trim().to_string(),
        months: months.iter().map(|m| m.key.clone()).collect(),
        metrics_by_month,
        app_version: app_version.to_string(),
    }
}

fn chapter_or_fallback(chapter: &str) -> &str {
    if chapter.is_empty() {
        CHAPTER_FALLBACK
    } else {
        chapter
    }
}

pub fn render_human(payload: &SubmissionPayload, months: &[MonthRef]) -> String {
    let mut lines = vec![
        "Monthly Goals Submission".to_string(),
        format!("Region: {}", payload.region),
        format!("Chapter: {}", chapter_or_fallback(&payload.chapter)),
        format!("Staff: {}", payload.staff),
        format!("Window: {}", window_label(months)),
        format!("Submitted: {}", payload.created_at_iso),
        format!("Submission ID: {}", payload.submission_id),
    ];
    for key in &payload.months {
        let label = months.iter().find(|m| &m.key == key).map(|m| m.label.as_str()).unwrap_or(key.as_str());
        lines.push(String::new());
        lines.push(format!("{} ({})", label, key));
        let Some(metrics) = payload.metrics_by_month.get(key) else { continue };
        // Config order, not map order.
        for c in METRICS.iter() {
            let Some(entry) = metrics.get(c.key) else { continue };
            let mut line = format!("- {}: {}", c.label, format_goal(entry.goal));
            if !entry.reasons.is_empty() {
                line.push_str(&format!(" (Reasons: {})", entry.reasons.join(", ")));
            }
            if !entry.note.is_empty() {
                line.push_str(&format!(" (Note: {})", entry.note));
            }
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Human text, then the marker line, then the payload as pretty JSON.
pub fn render_combined(payload: &SubmissionPayload, months: &[MonthRef]) -> AppResult<String> {
    let json = serde_json::to_string_pretty(payload)?;
    Ok(format!("{}\n\n{}\n{}\n", render_human(payload, months), MACHINE_MARKER, json))
}

/// Recover the payload from a combined block, e.g. a pasted email body.
pub fn extract_payload(text: &str) -> AppResult<SubmissionPayload> {
    let mut lines = text.lines();
    if !lines.by_ref().any(|l| l.trim() == MACHINE_MARKER) {
        return Err(AppError::Input(format!("no `{}` line found", MACHINE_MARKER)));
    }
    let json: Vec<&str> = lines.collect();
    Ok(serde_json::from_str(&json.join("\n"))?)
}

fn sanitize_part(s: &str) -> String {
    let underscored = s.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = underscored
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(FILENAME_PART_MAX)
        .collect();
    if cleaned.is_empty() {
        FILENAME_EMPTY_TOKEN.to_string()
    } else {
        cleaned
    }
}

pub fn submission_filename(months: &[MonthRef], identity: &Identity) -> String {
    let chapter = identity.chapter.trim();
    let chapter = if chapter.is_empty() {
        FILENAME_CHAPTER_FALLBACK.to_string()
    } else {
        sanitize_part(chapter)
    };
    format!(
        "goals_{}_{}_{}_{}.txt",
        sanitize_part(&window_key(months)),
        sanitize_part(&identity.region),
        chapter,
        sanitize_part(&identity.staff)
    )
}

pub fn receipt_line(payload: &SubmissionPayload, months: &[MonthRef]) -> String {
    let metric_count = payload
        .metrics_by_month
        .values()
        .next()
        .map(|m| m.keys().filter(|k| metric_config(k).is_some()).count())
        .unwrap_or(METRICS.len());
    format!(
        "Submitted {} | {} | {} | {} | {} metrics",
        window_label(months),
        payload.region,
        chapter_or_fallback(&payload.chapter),
        payload.staff,
        metric_count
    )
}
