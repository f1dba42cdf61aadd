// Compiled-in metric set and the optional TOML runtime configuration.
use crate::errors::{AppError, AppResult};
use crate::types::MetricConfig;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "goal_planner.toml";

pub const METRICS: [MetricConfig; 4] = [
    MetricConfig {
        key: "events",
        label: "Events hosted",
        description: "Chapter events held during the month",
        unit_label: "events",
        goal_min: 0.0,
    },
    MetricConfig {
        key: "new_teens",
        label: "New teens engaged",
        description: "First-time teens attending any event",
        unit_label: "teens",
        goal_min: 0.0,
    },
    MetricConfig {
        key: "avg_attendance",
        label: "Average attendance",
        description: "Mean headcount per event",
        unit_label: "attendees",
        goal_min: 0.0,
    },
    MetricConfig {
        key: "retention_contacts",
        label: "Retention contacts",
        description: "Follow-up calls, texts or visits with returning teens",
        unit_label: "contacts",
        goal_min: 0.0,
    },
];

pub static METRIC_KEYS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| METRICS.iter().map(|m| m.key).collect());

/// Reason tags offered next to each goal.
pub const REASON_OPTIONS: [&str; 6] = [
    "Seasonal pattern",
    "School calendar",
    "Staffing change",
    "New partnership",
    "Venue availability",
    "Stretch goal",
];

pub fn metric_config(key: &str) -> Option<&'static MetricConfig> {
    METRICS.iter().find(|m| m.key == key)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tried in order; the first readable file with a valid header wins.
    pub history_paths: Vec<PathBuf>,
    pub events_paths: Vec<PathBuf>,
    pub storage_path: PathBuf,
    pub output_dir: PathBuf,
    /// Months between the current month and the first planned month.
    pub month_offset: i32,
    pub window_months: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_paths: vec![PathBuf::from("data/history.csv"), PathBuf::from("history.csv")],
            events_paths: vec![PathBuf::from("data/events.csv"), PathBuf::from("events.csv")],
            storage_path: PathBuf::from(".goal_planner/storage.json"),
            output_dir: PathBuf::from("submissions"),
            month_offset: 1,
            window_months: 1,
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// file is used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> AppResult<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                p
            }
        };
        let text = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let cfg = Self::from_toml(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> AppResult<Self> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> AppResult<()> {
        if !(1..=2).contains(&self.window_months) {
            return Err(AppError::Config(format!(
                "window_months must be 1 or 2, got {}",
                self.window_months
            )));
        }
        if self.history_paths.is_empty() {
            return Err(AppError::Config("history_paths must not be empty".to_string()));
        }
        Ok(())
    }
}
