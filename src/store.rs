//! Key-value persistence for the profile and per-scope goal drafts.
//!
//! Every stored value is a JSON string written whole. Reads never fail:
//! a missing or unparseable value is treated as absent.

use crate::errors::{AppError, AppResult};
use crate::types::{GoalsByMonth, Identity, MonthRef, Profile};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PROFILE_KEY: &str = "goal_planner.profile.v1";
pub const DRAFT_PREFIX: &str = "goal_planner.draft.v1";
pub const KEY_SEPARATOR: &str = "::";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> AppResult<()>;
    fn delete(&mut self, key: &str) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All entries in one JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "storage file unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no storage file yet");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "storage file unreadable, starting empty");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    fn flush(&self) -> AppResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, text)
            .map_err(|e| AppError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn delete(&mut self, key: &str) -> AppResult<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// `%` and `:` are percent-encoded so a component can never contain the
/// separator.
fn escape_key_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

/// Draft key for a scope. Identity parts are trimmed and escaped, and month
/// keys sorted, so the same scope always reloads the same draft.
pub fn draft_key(identity: &Identity, month_keys: &[&str]) -> String {
    let mut months = month_keys.to_vec();
    months.sort_unstable();
    let mut parts = vec![DRAFT_PREFIX.to_string()];
    parts.extend(
        [&identity.region, &identity.chapter, &identity.staff]
            .into_iter()
            .map(|p| escape_key_part(p.trim())),
    );
    parts.extend(months.into_iter().map(escape_key_part));
    parts.join(KEY_SEPARATOR)
}

pub fn draft_key_for(identity: &Identity, months: &[MonthRef]) -> String {
    let keys: Vec<&str> = months.iter().map(|m| m.key.as_str()).collect();
    draft_key(identity, &keys)
}

pub fn load_profile(store: &dyn KeyValueStore) -> Profile {
    store
        .get(PROFILE_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub fn save_profile(store: &mut dyn KeyValueStore, profile: &Profile) -> AppResult<()> {
    let raw = serde_json::to_string(profile)?;
    store.set(PROFILE_KEY, &raw)
}

pub fn load_draft(store: &dyn KeyValueStore, key: &str) -> Option<GoalsByMonth> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(goals) => Some(goals),
        Err(e) => {
            warn!(key, error = %e, "ignoring corrupt draft");
            None
        }
    }
}

pub fn save_draft(store: &mut dyn KeyValueStore, key: &str, goals: &GoalsByMonth) -> AppResult<()> {
    let raw = serde_json::to_string(goals)?;
    store.set(key, &raw)
}

pub fn clear_draft(store: &mut dyn KeyValueStore, key: &str) -> AppResult<()> {
    store.delete(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricDraft;
    use proptest::prelude::*;

    fn identity(region: &str, chapter: &str, staff: &str) -> Identity {
        Identity { region: region.to_string(), chapter: chapter.to_string(), staff: staff.to_string() }
    }

    fn sample_goals() -> GoalsByMonth {
        let mut draft = MetricDraft { goal_value: Some(6.0), note: "spring push".to_string(), ..Default::default() };
        draft.reasons.insert("Seasonal pattern".to_string());
        draft.reasons.insert("Stretch goal".to_string());
        let mut metrics = BTreeMap::new();
        metrics.insert("events".to_string(), draft);
        metrics.insert("new_teens".to_string(), MetricDraft::default());
        let mut goals = GoalsByMonth::new();
        goals.insert("2025-03".to_string(), metrics);
        goals
    }

    #[test]
    fn draft_round_trip_and_clear() {
        let mut store = MemoryStore::new();
        let key = draft_key(&identity("Midwest", "Chicago", "Jo Lee"), &["2025-03"]);
        let goals = sample_goals();
        save_draft(&mut store, &key, &goals).unwrap();
        assert_eq!(load_draft(&store, &key), Some(goals));
        clear_draft(&mut store, &key).unwrap();
        assert_eq!(load_draft(&store, &key), None);
    }

    #[test]
    fn corrupt_values_read_as_absent() {
        let mut store = MemoryStore::new();
        store.set(PROFILE_KEY, "{not json").unwrap();
        store.set("draft", "[1,2,3]").unwrap();
        assert_eq!(load_profile(&store), Profile::default());
        assert_eq!(load_draft(&store, "draft"), None);
        assert_eq!(load_draft(&store, "missing"), None);
    }

    #[test]
    fn profile_overwrites_whole_value() {
        let mut store = MemoryStore::new();
        let first = Profile {
            staff_name: "Jo Lee".to_string(),
            last_region: "Midwest".to_string(),
            last_chapter: "Chicago".to_string(),
        };
        save_profile(&mut store, &first).unwrap();
        let second = Profile { staff_name: "Sam".to_string(), ..Default::default() };
        save_profile(&mut store, &second).unwrap();
        assert_eq!(load_profile(&store), second);
    }

    #[test]
    fn any_component_changes_the_key() {
        let base = draft_key(&identity("Midwest", "Chicago", "Jo"), &["2025-03"]);
        assert_ne!(base, draft_key(&identity("South", "Chicago", "Jo"), &["2025-03"]));
        assert_ne!(base, draft_key(&identity("Midwest", "", "Jo"), &["2025-03"]));
        assert_ne!(base, draft_key(&identity("Midwest", "Chicago", "Sam"), &["2025-03"]));
        assert_ne!(base, draft_key(&identity("Midwest", "Chicago", "Jo"), &["2025-04"]));
        assert_ne!(base, draft_key(&identity("Midwest", "Chicago", "Jo"), &["2025-03", "2025-04"]));
    }

    #[test]
    fn separator_inside_a_component_does_not_collide() {
        let a = draft_key(&identity("A::B", "C", "s"), &["2025-03"]);
        let b = draft_key(&identity("A", "B::C", "s"), &["2025-03"]);
        assert_ne!(a, b);
        assert_eq!(a, "goal_planner.draft.v1::A%3A%3AB::C::s::2025-03");
        assert_ne!(
            draft_key(&identity("A%3A", "C", "s"), &["2025-03"]),
            draft_key(&identity("A:", "C", "s"), &["2025-03"])
        );
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let key = draft_key(&identity("Midwest", "Chicago", "Jo"), &["2025-03"]);
        {
            let mut store = FileStore::open(&path);
            save_draft(&mut store, &key, &sample_goals()).unwrap();
        }
        let mut store = FileStore::open(&path);
        assert_eq!(load_draft(&store, &key), Some(sample_goals()));
        clear_draft(&mut store, &key).unwrap();
        assert_eq!(load_draft(&FileStore::open(&path), &key), None);
    }

    #[test]
    fn file_store_tolerates_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "garbage").unwrap();
        let mut store = FileStore::open(&path);
        assert_eq!(load_profile(&store), Profile::default());
        save_profile(&mut store, &Profile { staff_name: "Jo".to_string(), ..Default::default() }).unwrap();
        assert_eq!(load_profile(&FileStore::open(&path)).staff_name, "Jo");
    }

    #[test]
    fn file_store_tolerates_non_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x9f]).unwrap();
        let mut store = FileStore::open(&path);
        assert_eq!(load_profile(&store), Profile::default());
        save_profile(&mut store, &Profile { staff_name: "Jo".to_string(), ..Default::default() }).unwrap();
        assert_eq!(load_profile(&FileStore::open(&path)).staff_name, "Jo");
    }

    #[test]
    fn directory_in_place_of_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path());
        assert_eq!(load_profile(&store), Profile::default());
    }

    proptest! {
        #[test]
        fn key_ignores_surrounding_whitespace(
            region in "[A-Za-z]{1,8}",
            chapter in "[A-Za-z]{0,8}",
            staff in "[A-Za-z]{1,8}",
            pad in "[ \t]{0,3}",
        ) {
            let plain = draft_key(&identity(&region, &chapter, &staff), &["2025-03"]);
            let padded = draft_key(
                &identity(&format!("{pad}{region}{pad}"), &format!("{pad}{chapter}"), &format!("{staff}{pad}")),
                &["2025-03"],
            );
            prop_assert_eq!(plain, padded);
        }
    }
}
