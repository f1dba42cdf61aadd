use goal_planner::loader::{parse_events_csv, parse_history_csv};
use goal_planner::months::month_ref;
use goal_planner::store::{draft_key, load_draft, load_profile, MemoryStore};
use goal_planner::submission::{extract_payload, MACHINE_MARKER};
use goal_planner::types::{EventRow, HistoryRow, Identity};
use goal_planner::wizard::{Outcome, Wizard, WizardContext};
use std::io::Cursor;
use std::path::Path;

const HISTORY: &str = "region,chapter,metric_key,year,month,value
Midwest,Chicago,events,2023,3,5
Midwest,Chicago,events,2024,3,7
Midwest,Chicago,new_teens,2024,3,11
Midwest,Chicago,events,2025,3,40
Midwest,Detroit,events,2024,3,2
";

const EVENTS: &str = "region,chapter,year,month,event_name,events,new_teens,avg_attendance,retention_contacts,notes
Midwest,Chicago,2024,3,\"Spring Kickoff, Night 1\",1,4,22,6,
";

fn data() -> (Vec<HistoryRow>, Vec<EventRow>) {
    (parse_history_csv(HISTORY).unwrap().rows, parse_events_csv(EVENTS).unwrap().rows)
}

fn context<'a>(history: &'a [HistoryRow], events: &'a [EventRow], out_dir: &Path) -> WizardContext<'a> {
    WizardContext {
        history,
        history_error: None,
        events,
        months: vec![month_ref(2025, 3)],
        locked_region: None,
        locked_chapter: None,
        output_dir: out_dir.to_path_buf(),
    }
}

fn run(store: &mut MemoryStore, ctx: WizardContext<'_>, script: &str) -> (Outcome, String) {
    let mut out = Vec::new();
    let outcome = Wizard::new(Cursor::new(script.to_string()), &mut out, store, ctx).run().unwrap();
    (outcome, String::from_utf8(out).unwrap())
}

fn chicago_key() -> String {
    let identity = Identity {
        region: "Midwest".to_string(),
        chapter: "Chicago".to_string(),
        staff: "Jo Lee".to_string(),
    };
    draft_key(&identity, &["2025-03"])
}

// name, region, chapter, then goal/reasons/note for each of the four
// metrics in order.
const FULL_ENTRY: &str = "Jo Lee\nMidwest\nChicago\n\n1,6\nspring push\n\n\n\n12.5\n\n\n3\n\n\n";

#[test]
fn submits_with_prefilled_suggestions() {
    let (history, events) = data();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();

    let (outcome, transcript) = run(&mut store, context(&history, &events, dir.path()), &format!("{FULL_ENTRY}y\n"));

    let Outcome::Submitted { path, receipt, submission_id } = outcome else {
        panic!("expected submission, got {outcome:?}\n{transcript}");
    };
    assert_eq!(path, dir.path().join("goals_2025-03_Midwest_Chicago_Jo_Lee.txt"));
    assert_eq!(receipt, "Submitted March 2025 | Midwest | Chicago | Jo Lee | 4 metrics");
    assert!(transcript.contains("Spring Kickoff, Night 1"));
    assert!(transcript.contains("Known chapters: Chicago, Detroit"));

    let text = std::fs::read_to_string(&path).unwrap();
    // 2023 and 2024 only: the 2025 row is the target year.
    assert!(text.contains("- Events hosted: 6 (Reasons: Seasonal pattern, Stretch goal) (Note: spring push)"));
    assert!(text.contains("- New teens engaged: 11\n"));
    assert!(text.contains("- Average attendance: 12.50\n"));
    assert!(text.contains("- Retention contacts: 3"));
    assert!(text.contains(MACHINE_MARKER));

    let payload = extract_payload(&text).unwrap();
    assert_eq!(payload.submission_id, submission_id);
    assert_eq!(payload.metrics_by_month["2025-03"]["avg_attendance"].goal, 12.5);

    assert_eq!(load_draft(&store, &chicago_key()), None);
    let profile = load_profile(&store);
    assert_eq!(profile.staff_name, "Jo Lee");
    assert_eq!(profile.last_chapter, "Chicago");
}

#[test]
fn declined_submission_keeps_draft_for_next_run() {
    let (history, events) = data();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();

    let (outcome, _) = run(&mut store, context(&history, &events, dir.path()), &format!("{FULL_ENTRY}n\nn\n"));
    assert_eq!(outcome, Outcome::DraftSaved);
    let draft = load_draft(&store, &chicago_key()).unwrap();
    assert_eq!(draft["2025-03"]["retention_contacts"].goal_value, Some(3.0));

    // Profile defaults fill name, region and chapter; the draft is reloaded
    // instead of fresh suggestions.
    let second = "\n\n\n\n\n\n\n\n\n\n\n\n\n\n\ny\n";
    let (outcome, transcript) = run(&mut store, context(&history, &events, dir.path()), second);
    assert!(transcript.contains("Your name [Jo Lee]: "));
    assert!(transcript.contains("Resuming your saved draft."));
    let Outcome::Submitted { path, .. } = outcome else {
        panic!("expected submission\n{transcript}");
    };
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("- Retention contacts: 3"));
    assert!(text.contains("(Note: spring push)"));
}

#[test]
fn missing_goals_block_submission() {
    let (_, events) = data();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    let mut ctx = context(&[], &events, dir.path());
    ctx.history_error = Some("no usable history file".to_string());

    let script = "Sam\nSouth\n\n\n\n\n4\n\n\n\n\n\n\n\n\nn\n";
    let (outcome, transcript) = run(&mut store, ctx, script);
    assert_eq!(outcome, Outcome::DraftSaved);
    assert!(transcript.contains("Warning: historical data unavailable"));
    assert!(transcript.contains("2025-03 / Events hosted: a goal is required"));
    assert!(!transcript.contains("New teens engaged: a goal is required"));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn locked_region_and_chapter_skip_prompts() {
    let (history, events) = data();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    let mut ctx = context(&history, &events, dir.path());
    ctx.locked_region = Some("Midwest".to_string());
    ctx.locked_chapter = Some(String::new());

    let script = "Jo Lee\n\n\n\n\n\n\n1\n\n\n1\n\n\ny\n";
    let (outcome, transcript) = run(&mut store, ctx, script);
    assert!(transcript.contains("Region: Midwest (from link)"));
    assert!(!transcript.contains("Known regions"));
    let Outcome::Submitted { path, .. } = outcome else {
        panic!("expected submission\n{transcript}");
    };
    assert_eq!(path.file_name().unwrap(), "goals_2025-03_Midwest_AllChapters_Jo_Lee.txt");
    // Region-wide: Chicago 5, 7 and Detroit 2 -> 4.67 -> 5
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("- Events hosted: 5\n"));
}

#[test]
fn end_of_input_cancels() {
    let (history, events) = data();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    let (outcome, _) = run(&mut store, context(&history, &events, dir.path()), "Jo Lee\nMidwest\n");
    assert_eq!(outcome, Outcome::Cancelled);
}

#[test]
fn profile_is_remembered_once_identified() {
    let (history, events) = data();
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryStore::new();
    let (outcome, _) = run(&mut store, context(&history, &events, dir.path()), "Jo Lee\nMidwest\nChicago\n");
    assert_eq!(outcome, Outcome::Cancelled);
    let profile = load_profile(&store);
    assert_eq!(profile.staff_name, "Jo Lee");
    assert_eq!(profile.last_region, "Midwest");
    assert_eq!(profile.last_chapter, "Chicago");
}
