//! Monthly goal planning from historical CSV data.
//!
//! - `loader` parses the history and events files (lenient at runtime,
//!   strict for `validate`).
//! - `stats` computes trailing same-month averages and variability.
//! - `store` persists the profile and per-scope drafts.
//! - `submission` renders the final text artifact.
//! - `wizard` drives the interactive flow over any reader/writer pair.
pub mod config;
pub mod errors;
pub mod goals;
pub mod loader;
pub mod months;
pub mod output;
pub mod stats;
pub mod store;
pub mod submission;
pub mod types;
pub mod util;
pub mod validate;
pub mod wizard;
