//! Terminal goal-entry flow: welcome, identify, goals, review, submit.
//!
//! The wizard reads answers line by line from any `BufRead` and writes its
//! prompts to any `Write`, so the whole flow can be scripted. End of input
//! cancels; drafts already saved are kept.

use crate::config::{APP_VERSION, METRICS, REASON_OPTIONS};
use crate::errors::AppResult;
use crate::goals::{normalize_goals, prefill_goals, validate_goals};
use crate::loader::{chapters, events_for, regions};
use crate::months::window_label;
use crate::output::{preview_table_rows, write_text};
use crate::stats::metric_stats_table;
use crate::store::{
    clear_draft, draft_key_for, load_draft, load_profile, save_draft, save_profile, KeyValueStore,
};
use crate::submission::{build_payload, receipt_line, render_combined, render_human, submission_filename};
use crate::types::{EventPreviewRow, EventRow, GoalsByMonth, HistoryRow, Identity, MonthRef, Profile, SubmissionPayload};
use crate::util::{format_goal, format_int, format_number, parse_f64_safe};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

const MAX_EVENT_ROWS: usize = 5;

/// Everything the flow needs besides its streams and the store.
pub struct WizardContext<'a> {
    pub history: &'a [HistoryRow],
    /// Set when history could not be loaded; suggestions stay blank.
    pub history_error: Option<String>,
    pub events: &'a [EventRow],
    pub months: Vec<MonthRef>,
    /// Pre-set from the command line; the prompt is skipped.
    pub locked_region: Option<String>,
    pub locked_chapter: Option<String>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Submitted { path: PathBuf, receipt: String, submission_id: String },
    /// Stopped at review; the draft stays in the store.
    DraftSaved,
    Cancelled,
}

pub struct Wizard<'a, R, W> {
    input: R,
    out: W,
    store: &'a mut dyn KeyValueStore,
    ctx: WizardContext<'a>,
}

impl<'a, R: BufRead, W: Write> Wizard<'a, R, W> {
    pub fn new(input: R, out: W, store: &'a mut dyn KeyValueStore, ctx: WizardContext<'a>) -> Self {
        Self { input, out, store, ctx }
    }

    pub fn run(&mut self) -> AppResult<Outcome> {
        let months = self.ctx.months.clone();
        self.welcome(&months)?;
        let Some(identity) = self.identify()? else {
            return Ok(Outcome::Cancelled);
        };

        let key = draft_key_for(&identity, &months);
        let mut goals = match load_draft(&*self.store, &key) {
            Some(draft) => {
                writeln!(self.out, "\nResuming your saved draft.")?;
                normalize_goals(draft, &months)
            }
            None => prefill_goals(self.ctx.history, &identity.region, &identity.chapter, &months),
        };

        loop {
            if !self.enter_goals(&identity, &key, &months, &mut goals)? {
                return Ok(Outcome::Cancelled);
            }

            let errors = validate_goals(&goals, &months);
            if !errors.is_empty() {
                writeln!(self.out, "\nPlease fix the following before submitting:")?;
                for e in &errors {
                    writeln!(self.out, "  - {}", e)?;
                }
                match self.confirm("Edit goals again? (Y/N): ")? {
                    Some(true) => continue,
                    Some(false) => return self.stop_with_draft(),
                    None => return Ok(Outcome::Cancelled),
                }
            }

            let payload = build_payload(&months, &goals, &identity, APP_VERSION);
            writeln!(self.out, "\nReview\n------\n{}\n", render_human(&payload, &months))?;
            match self.confirm("Submit these goals? (Y/N): ")? {
                Some(true) => return self.submit(&identity, &key, &months, &payload),
                Some(false) => {}
                None => return Ok(Outcome::Cancelled),
            }
            match self.confirm("Edit goals again? (Y/N): ")? {
                Some(true) => continue,
                Some(false) => return self.stop_with_draft(),
                None => return Ok(Outcome::Cancelled),
            }
        }
    }

    fn welcome(&mut self, months: &[MonthRef]) -> AppResult<()> {
        writeln!(self.out, "Monthly Goal Planning")?;
        writeln!(self.out, "Planning window: {}", window_label(months))?;
        match &self.ctx.history_error {
            Some(e) => writeln!(
                self.out,
                "Warning: historical data unavailable ({}). Suggestions will be blank.",
                e
            )?,
            None => writeln!(
                self.out,
                "Historical data: {} rows, {} events",
                format_int(self.ctx.history.len()),
                format_int(self.ctx.events.len())
            )?,
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn identify(&mut self) -> AppResult<Option<Identity>> {
        let profile = load_profile(&*self.store);
        let Some(staff) = self.ask_required("Your name", &profile.staff_name)? else {
            return Ok(None);
        };

        let region = match self.ctx.locked_region.clone() {
            Some(r) => {
                writeln!(self.out, "Region: {} (from link)", r)?;
                r
            }
            None => {
                let known = regions(self.ctx.history);
                if !known.is_empty() {
                    writeln!(self.out, "Known regions: {}", known.join(", "))?;
                }
                match self.ask_required("Region", &profile.last_region)? {
                    Some(r) => r,
                    None => return Ok(None),
                }
            }
        };

        let chapter = match self.ctx.locked_chapter.clone() {
            Some(c) => {
                let shown = if c.is_empty() { "region-wide" } else { c.as_str() };
                writeln!(self.out, "Chapter: {} (from link)", shown)?;
                c
            }
            None => {
                let known = chapters(self.ctx.history, &region);
                if !known.is_empty() {
                    writeln!(self.out, "Known chapters: {}", known.join(", "))?;
                }
                let default = if profile.last_region == region { profile.last_chapter.as_str() } else { "" };
                match self.ask_with_default("Chapter (blank for region-wide, '-' to clear)", default)? {
                    Some(c) if c == "-" => String::new(),
                    Some(c) => c,
                    None => return Ok(None),
                }
            }
        };

        let identity = Identity { region, chapter, staff };
        let profile = Profile {
            staff_name: identity.staff.clone(),
            last_region: identity.region.clone(),
            last_chapter: identity.chapter.clone(),
        };
        if let Err(e) = save_profile(&mut *self.store, &profile) {
            warn!(error = %e, "could not save profile");
        }
        Ok(Some(identity))
    }

    /// One pass over every month and metric. Returns `false` on end of input.
    fn enter_goals(
        &mut self,
        identity: &Identity,
        key: &str,
        months: &[MonthRef],
        goals: &mut GoalsByMonth,
    ) -> AppResult<bool> {
        for month in months {
            writeln!(self.out, "\n{}", month.label)?;
            let table = metric_stats_table(self.ctx.history, &identity.region, &identity.chapter, month);
            preview_table_rows(&mut self.out, &table, table.len())?;

            let past: Vec<EventPreviewRow> = events_for(
                self.ctx.events,
                &identity.region,
                &identity.chapter,
                month.month,
                month.year,
            )
            .into_iter()
            .map(|e| EventPreviewRow {
                year: e.year,
                event_name: e.event_name.clone(),
                events: format_goal(e.events),
                new_teens: format_goal(e.new_teens),
                avg_attendance: format_number(e.avg_attendance, 1),
                retention_contacts: format_goal(e.retention_contacts),
            })
            .collect();
            if !past.is_empty() {
                writeln!(self.out, "Past events this month:")?;
                preview_table_rows(&mut self.out, &past, MAX_EVENT_ROWS)?;
            }

            let options: Vec<String> =
                REASON_OPTIONS.iter().enumerate().map(|(i, r)| format!("{}) {}", i + 1, r)).collect();
            writeln!(self.out, "Reason tags: {}", options.join("  "))?;

            let month_goals = goals.entry(month.key.clone()).or_default();
            for c in METRICS.iter() {
                let draft = month_goals.entry(c.key.to_string()).or_default();

                let current = draft.goal_value.map(format_goal).unwrap_or_default();
                loop {
                    let prompt = format!("  {} ({})", c.label, c.unit_label);
                    let Some(v) = self.ask_with_default(&prompt, &current)? else {
                        return Ok(false);
                    };
                    if v.is_empty() {
                        draft.goal_value = None;
                        break;
                    }
                    match parse_f64_safe(&v) {
                        Some(n) => {
                            draft.goal_value = Some(n);
                            break;
                        }
                        None => writeln!(self.out, "    Please enter a number.")?,
                    }
                }

                loop {
                    let shown: Vec<&str> = draft.reasons.iter().map(String::as_str).collect();
                    let prompt = if shown.is_empty() {
                        "    Reasons (numbers, comma-separated): ".to_string()
                    } else {
                        format!("    Reasons [{}] ('-' for none): ", shown.join(", "))
                    };
                    let Some(v) = self.ask_line(&prompt)? else {
                        return Ok(false);
                    };
                    if v.is_empty() {
                        break;
                    }
                    if v == "-" {
                        draft.reasons.clear();
                        break;
                    }
                    match parse_reasons(&v) {
                        Some(reasons) => {
                            draft.reasons = reasons;
                            break;
                        }
                        None => writeln!(self.out, "    Use numbers 1-{}.", REASON_OPTIONS.len())?,
                    }
                }

                let note = draft.note.clone();
                let Some(v) = self.ask_with_default("    Note ('-' to clear)", &note)? else {
                    return Ok(false);
                };
                draft.note = if v == "-" { String::new() } else { v };
            }

            if let Err(e) = save_draft(&mut *self.store, key, goals) {
                warn!(error = %e, "could not save draft");
            }
        }
        Ok(true)
    }

    fn submit(
        &mut self,
        identity: &Identity,
        key: &str,
        months: &[MonthRef],
        payload: &SubmissionPayload,
    ) -> AppResult<Outcome> {
        let text = render_combined(payload, months)?;
        let path = write_text(&self.ctx.output_dir, &submission_filename(months, identity), &text)?;
        let receipt = receipt_line(payload, months);
        info!(path = %path.display(), submission_id = %payload.submission_id, "submission written");
        if let Err(e) = clear_draft(&mut *self.store, key) {
            warn!(error = %e, "could not clear draft");
        }
        writeln!(self.out, "\nSaved to {}", path.display())?;
        writeln!(self.out, "{}", receipt)?;
        Ok(Outcome::Submitted { path, receipt, submission_id: payload.submission_id.clone() })
    }

    fn stop_with_draft(&mut self) -> AppResult<Outcome> {
        writeln!(self.out, "Draft saved. Pick up where you left off next time.")?;
        Ok(Outcome::DraftSaved)
    }

    /// Print `prompt`, read one trimmed line. `None` at end of input.
    fn ask_line(&mut self, prompt: &str) -> AppResult<Option<String>> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim().to_string()))
    }

    /// Blank input takes `default`.
    fn ask_with_default(&mut self, label: &str, default: &str) -> AppResult<Option<String>> {
        let prompt = if default.is_empty() {
            format!("{}: ", label)
        } else {
            format!("{} [{}]: ", label, default)
        };
        Ok(self.ask_line(&prompt)?.map(|v| if v.is_empty() { default.to_string() } else { v }))
    }

    fn ask_required(&mut self, label: &str, default: &str) -> AppResult<Option<String>> {
        loop {
            match self.ask_with_default(label, default)? {
                Some(v) if v.is_empty() => writeln!(self.out, "  This field is required.")?,
                other => return Ok(other),
            }
        }
    }

    fn confirm(&mut self, prompt: &str) -> AppResult<Option<bool>> {
        loop {
            let Some(v) = self.ask_line(prompt)? else {
                return Ok(None);
            };
            match v.to_uppercase().as_str() {
                "Y" | "YES" => return Ok(Some(true)),
                "N" | "NO" => return Ok(Some(false)),
                _ => writeln!(self.out, "Invalid choice. Please enter Y or N.")?,
            }
        }
    }
}

/// `"1, 3"` -> the first and third reason tags. `None` if any part is not
/// a valid option number.
fn parse_reasons(input: &str) -> Option<BTreeSet<String>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let i: usize = s.parse().ok()?;
            REASON_OPTIONS.get(i.checked_sub(1)?).map(|r| r.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_parse_by_number() {
        let r = parse_reasons("6, 1,1").unwrap();
        assert_eq!(r.into_iter().collect::<Vec<_>>(), vec!["Seasonal pattern", "Stretch goal"]);
        assert!(parse_reasons("0").is_none());
        assert!(parse_reasons("7").is_none());
        assert!(parse_reasons("x").is_none());
    }
}
