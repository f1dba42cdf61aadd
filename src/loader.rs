use crate::config::METRIC_KEYS;
use crate::errors::{AppError, AppResult};
use crate::types::{EventRow, HistoryRow};
use crate::util::{parse_count_safe, parse_f64_safe, parse_i32_safe};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const HISTORY_HEADER: [&str; 6] = ["region", "chapter", "metric_key", "year", "month", "value"];

pub const EVENTS_HEADER: [&str; 10] = [
    "region",
    "chapter",
    "year",
    "month",
    "event_name",
    "events",
    "new_teens",
    "avg_attendance",
    "retention_contacts",
    "notes",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowIssue {
    #[error("header mismatch, expected `{0}`")]
    Header(String),
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("missing region")]
    MissingRegion,
    #[error("year `{0}` is not an integer")]
    InvalidYear(String),
    #[error("month `{0}` is not an integer")]
    InvalidMonth(String),
    #[error("month {0} is outside 1-12")]
    MonthOutOfRange(i32),
    #[error("unknown metric_key `{0}`")]
    UnknownMetric(String),
    #[error("{column} `{value}` is not a valid number")]
    InvalidNumber { column: &'static str, value: String },
}

/// A rejected line; `line` is 1-based and counts blank lines.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {issue}")]
pub struct RowError {
    pub line: usize,
    pub issue: RowIssue,
}

/// Rows that survived lenient decoding plus how many were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: PathBuf,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
}

/// Split one CSV line into trimmed fields.
///
/// A `"` toggles quoted mode wherever it appears; inside quotes a comma is
/// literal and `""` is an escaped quote. An unterminated quote runs to the
/// end of the line.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    cur.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cur.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut cur).trim().to_string()),
                _ => cur.push(ch),
            }
        }
    }
    fields.push(cur.trim().to_string());
    fields
}

/// Non-blank trimmed lines with their 1-based line numbers. Handles both
/// `\n` and `\r\n` endings.
pub fn split_lines(text: &str) -> Vec<(usize, &str)> {
    text.split('\n')
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .collect()
}

fn check_header(first: Option<&(usize, &str)>, expected: &[&str]) -> Result<(), AppError> {
    let found = first.map(|(_, l)| l.trim_start_matches('\u{feff}')).unwrap_or("");
    let fields = parse_csv_line(found);
    if fields.iter().map(String::as_str).eq(expected.iter().copied()) {
        Ok(())
    } else {
        Err(AppError::HeaderMismatch { expected: expected.join(","), found: found.to_string() })
    }
}

fn expect_columns(fields: &[String], expected: usize) -> Result<(), RowIssue> {
    if fields.len() != expected {
        return Err(RowIssue::ColumnCount { expected, found: fields.len() });
    }
    Ok(())
}

fn decode_year(s: &str) -> Result<i32, RowIssue> {
    parse_i32_safe(s).ok_or_else(|| RowIssue::InvalidYear(s.to_string()))
}

fn decode_month(s: &str) -> Result<u32, RowIssue> {
    let m = parse_i32_safe(s).ok_or_else(|| RowIssue::InvalidMonth(s.to_string()))?;
    if !(1..=12).contains(&m) {
        return Err(RowIssue::MonthOutOfRange(m));
    }
    Ok(m as u32)
}

fn decode_count(column: &'static str, s: &str) -> Result<f64, RowIssue> {
    parse_count_safe(s).ok_or_else(|| RowIssue::InvalidNumber { column, value: s.to_string() })
}

pub fn decode_history_row(fields: &[String]) -> Result<HistoryRow, RowIssue> {
    expect_columns(fields, HISTORY_HEADER.len())?;
    if fields[0].is_empty() {
        return Err(RowIssue::MissingRegion);
    }
    if !METRIC_KEYS.contains(fields[2].as_str()) {
        return Err(RowIssue::UnknownMetric(fields[2].clone()));
    }
    let year = decode_year(&fields[3])?;
    let month = decode_month(&fields[4])?;
    let value = parse_f64_safe(&fields[5])
        .ok_or_else(|| RowIssue::InvalidNumber { column: "value", value: fields[5].clone() })?;
    Ok(HistoryRow {
        region: fields[0].clone(),
        chapter: fields[1].clone(),
        metric_key: fields[2].clone(),
        year,
        month,
        value,
    })
}

pub fn decode_event_row(fields: &[String]) -> Result<EventRow, RowIssue> {
    expect_columns(fields, EVENTS_HEADER.len())?;
    if fields[0].is_empty() {
        return Err(RowIssue::MissingRegion);
    }
    Ok(EventRow {
        region: fields[0].clone(),
        chapter: fields[1].clone(),
        year: decode_year(&fields[2])?,
        month: decode_month(&fields[3])?,
        event_name: fields[4].clone(),
        events: decode_count("events", &fields[5])?,
        new_teens: decode_count("new_teens", &fields[6])?,
        avg_attendance: decode_count("avg_attendance", &fields[7])?,
        retention_contacts: decode_count("retention_contacts", &fields[8])?,
        notes: fields[9].clone(),
    })
}

type Decoder<T> = fn(&[String]) -> Result<T, RowIssue>;

/// Shared core of both policies: header check, then every data line
/// through `decode`.
fn decode_all<T>(
    text: &str,
    header: &[&str],
    decode: Decoder<T>,
) -> AppResult<(Vec<T>, Vec<RowError>)> {
    let lines = split_lines(text);
    check_header(lines.first(), header)?;
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (line, raw) in lines.iter().skip(1) {
        match decode(&parse_csv_line(raw)) {
            Ok(r) => rows.push(r),
            Err(issue) => errors.push(RowError { line: *line, issue }),
        }
    }
    Ok((rows, errors))
}

fn lenient<T>(text: &str, header: &[&str], decode: Decoder<T>) -> AppResult<Parsed<T>> {
    let (rows, errors) = decode_all(text, header, decode)?;
    for e in &errors {
        debug!(line = e.line, issue = %e.issue, "skipping row");
    }
    Ok(Parsed { rows, skipped: errors.len() })
}

fn strict<T>(text: &str, header: &[&str], decode: Decoder<T>) -> Result<Vec<T>, Vec<RowError>> {
    match decode_all(text, header, decode) {
        Ok((rows, errors)) if errors.is_empty() => Ok(rows),
        Ok((_, errors)) => Err(errors),
        Err(_) => {
            let line = split_lines(text).first().map(|(n, _)| *n).unwrap_or(1);
            Err(vec![RowError { line, issue: RowIssue::Header(header.join(",")) }])
        }
    }
}

/// Runtime policy: malformed rows are dropped and counted.
pub fn parse_history_csv(text: &str) -> AppResult<Parsed<HistoryRow>> {
    lenient(text, &HISTORY_HEADER, decode_history_row)
}

pub fn parse_events_csv(text: &str) -> AppResult<Parsed<EventRow>> {
    lenient(text, &EVENTS_HEADER, decode_event_row)
}

/// Authoring-time policy: any malformed row fails the file.
pub fn validate_history_csv(text: &str) -> Result<Vec<HistoryRow>, Vec<RowError>> {
    strict(text, &HISTORY_HEADER, decode_history_row)
}

pub fn validate_events_csv(text: &str) -> Result<Vec<EventRow>, Vec<RowError>> {
    strict(text, &EVENTS_HEADER, decode_event_row)
}

fn load_first<T>(
    paths: &[PathBuf],
    what: &str,
    parse: fn(&str) -> AppResult<Parsed<T>>,
) -> AppResult<(Vec<T>, LoadReport)> {
    let mut attempts = Vec::new();
    for path in paths {
        let result = std::fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|text| parse(&text));
        match result {
            Ok(parsed) => {
                info!(path = %path.display(), rows = parsed.rows.len(), skipped = parsed.skipped, "loaded {}", what);
                let report = LoadReport {
                    source: path.clone(),
                    loaded_rows: parsed.rows.len(),
                    skipped_rows: parsed.skipped,
                };
                return Ok((parsed.rows, report));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "{} source failed, trying next", what);
                attempts.push(format!("{}: {}", path.display(), e));
            }
        }
    }
    Err(AppError::DataUnavailable(format!("no usable {} file ({})", what, attempts.join("; "))))
}

/// Load history from the first usable path.
pub fn load_history(paths: &[PathBuf]) -> AppResult<(Vec<HistoryRow>, LoadReport)> {
    load_first(paths, "history", parse_history_csv)
}

/// Load events from the first usable path. Events are optional context, so
/// a total failure yields an empty list.
pub fn load_events(paths: &[PathBuf]) -> (Vec<EventRow>, Option<LoadReport>) {
    match load_first(paths, "events", parse_events_csv) {
        Ok((rows, report)) => (rows, Some(report)),
        Err(e) => {
            warn!(error = %e, "continuing without events");
            (Vec::new(), None)
        }
    }
}

pub fn read_text(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))
}

pub fn regions(history: &[HistoryRow]) -> Vec<String> {
    let set: BTreeSet<&str> = history.iter().map(|r| r.region.as_str()).collect();
    set.into_iter().map(str::to_string).collect()
}

pub fn chapters(history: &[HistoryRow], region: &str) -> Vec<String> {
    let set: BTreeSet<&str> = history
        .iter()
        .filter(|r| r.region == region && !r.chapter.is_empty())
        .map(|r| r.chapter.as_str())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// Prior-year events for the same month, most recent first. An empty
/// chapter matches every chapter of the region.
pub fn events_for<'a>(
    events: &'a [EventRow],
    region: &str,
    chapter: &str,
    month: u32,
    target_year: i32,
) -> Vec<&'a EventRow> {
    let mut out: Vec<&EventRow> = events
        .iter()
        .filter(|e| e.region == region)
        .filter(|e| chapter.is_empty() || e.chapter == chapter)
        .filter(|e| e.month == month && e.year < target_year)
        .collect();
    out.sort_by(|a, b| b.year.cmp(&a.year));
    out
}
