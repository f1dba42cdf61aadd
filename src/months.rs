use crate::errors::{AppError, AppResult};
use crate::types::MonthRef;
use chrono::{Datelike, NaiveDate};

pub fn month_ref(year: i32, month: u32) -> MonthRef {
    let label = NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{}-{:02}", year, month));
    MonthRef { key: format!("{}-{:02}", year, month), year, month, label }
}

/// Shift a (year, month) pair by `delta` months, either direction.
pub fn add_months(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let idx = year * 12 + (month as i32 - 1) + delta;
    (idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1)
}

/// The planning window: `len` consecutive months starting `offset` months
/// after the month containing `today`.
pub fn month_window(today: NaiveDate, offset: i32, len: usize) -> AppResult<Vec<MonthRef>> {
    if !(1..=2).contains(&len) {
        return Err(AppError::Input(format!("window must be 1 or 2 months, got {}", len)));
    }
    let (y, m) = add_months(today.year(), today.month(), offset);
    Ok((0..len as i32)
        .map(|i| {
            let (y, m) = add_months(y, m, i);
            month_ref(y, m)
        })
        .collect())
}

pub fn window_label(months: &[MonthRef]) -> String {
    match (months.first(), months.last()) {
        (Some(a), Some(b)) if a.key != b.key => format!("{} to {}", a.label, b.label),
        (Some(a), _) => a.label.clone(),
        _ => String::new(),
    }
}

/// Month keys joined with `_`, e.g. `2025-03_2025-04`.
pub fn window_key(months: &[MonthRef]) -> String {
    months.iter().map(|m| m.key.as_str()).collect::<Vec<_>>().join("_")
}
