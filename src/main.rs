// Entry point and high-level CLI flow.
//
// - Option [1] loads the history and events files, printing diagnostics.
// - Option [2] runs the goal wizard for the configured month window.
// - Option [3] validates the data files strictly.
// - `goal_planner validate` runs option [3] once and exits non-zero on
//   any problem.
use chrono::Local;
use clap::{Parser, Subcommand};
use goal_planner::config::AppConfig;
use goal_planner::errors::AppResult;
use goal_planner::loader;
use goal_planner::months::month_window;
use goal_planner::output;
use goal_planner::store::FileStore;
use goal_planner::types::{EventRow, HistoryRow};
use goal_planner::util::format_int;
use goal_planner::validate::{validate_files, ValidationReport};
use goal_planner::wizard::{Outcome, Wizard, WizardContext};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::EnvFilter;

// Loaded once, reused across wizard runs in the same session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    loaded: bool,
    history: Vec<HistoryRow>,
    history_error: Option<String>,
    events: Vec<EventRow>,
}

#[derive(Debug, Parser)]
#[command(name = "goal_planner", version, about = "Plan monthly goals from historical data")]
struct Cli {
    /// TOML configuration file (default: ./goal_planner.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pre-select the region and skip its prompt
    #[arg(long)]
    region: Option<String>,
    /// Pre-select the chapter and skip its prompt
    #[arg(long)]
    chapter: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check the data files and list every problem
    Validate {
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long)]
        events: Option<PathBuf>,
        /// Also write the problems as CSV
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .try_init();
}

fn lock_state() -> std::sync::MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Handle option [1]: load history and events.
///
/// A history failure is shown to the user and remembered, so the wizard
/// can still run with blank suggestions. Events fail quietly.
fn handle_load(cfg: &AppConfig) {
    let mut state = lock_state();
    match loader::load_history(&cfg.history_paths) {
        Ok((rows, report)) => {
            println!(
                "History: {} rows loaded from {} ({} skipped)",
                format_int(report.loaded_rows),
                report.source.display(),
                format_int(report.skipped_rows)
            );
            state.history = rows;
            state.history_error = None;
        }
        Err(e) => {
            eprintln!("Failed to load history: {}", e);
            state.history = Vec::new();
            state.history_error = Some(e.to_string());
        }
    }
    let (events, report) = loader::load_events(&cfg.events_paths);
    if let Some(report) = report {
        println!(
            "Events: {} rows loaded from {} ({} skipped)",
            format_int(report.loaded_rows),
            report.source.display(),
            format_int(report.skipped_rows)
        );
    }
    state.events = events;
    state.loaded = true;
    println!();
}

/// Handle option [2]: run the wizard once.
fn handle_plan(cfg: &AppConfig, cli: &Cli) -> AppResult<()> {
    if !lock_state().loaded {
        handle_load(cfg);
    }
    let state = lock_state();
    let months = month_window(Local::now().date_naive(), cfg.month_offset, cfg.window_months)?;
    let mut store = FileStore::open(&cfg.storage_path);
    let ctx = WizardContext {
        history: &state.history,
        history_error: state.history_error.clone(),
        events: &state.events,
        months,
        locked_region: cli.region.clone(),
        locked_chapter: cli.chapter.clone(),
        output_dir: cfg.output_dir.clone(),
    };
    let stdin = io::stdin();
    let mut wizard = Wizard::new(stdin.lock(), io::stdout(), &mut store, ctx);
    match wizard.run()? {
        Outcome::Submitted { .. } => println!("Done. Copy or email the saved file to your coordinator.\n"),
        Outcome::DraftSaved => println!(),
        Outcome::Cancelled => println!("\nGoal entry cancelled.\n"),
    }
    Ok(())
}

fn first_existing(paths: &[PathBuf]) -> PathBuf {
    paths
        .iter()
        .find(|p| p.exists())
        .or_else(|| paths.first())
        .cloned()
        .unwrap_or_default()
}

fn run_validation(cfg: &AppConfig, history: Option<&Path>, events: Option<&Path>) -> ValidationReport {
    let history = history.map(Path::to_path_buf).unwrap_or_else(|| first_existing(&cfg.history_paths));
    let events = events.map(Path::to_path_buf).unwrap_or_else(|| first_existing(&cfg.events_paths));
    let report = validate_files(&history, &events);
    if report.is_ok() {
        println!(
            "OK: {} history rows, {} event rows",
            format_int(report.history_rows),
            format_int(report.event_rows)
        );
    } else {
        println!("{} problem(s) found:", format_int(report.issues.len()));
        for issue in &report.issues {
            println!("  {}", issue);
        }
    }
    report
}

fn menu(cfg: &AppConfig, cli: &Cli) {
    loop {
        println!("Select Action:");
        println!("[1] Load data files");
        println!("[2] Plan monthly goals");
        println!("[3] Validate data files");
        println!("[4] Exit\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(cfg),
            "2" => {
                println!();
                if let Err(e) = handle_plan(cfg, cli) {
                    error!(error = %e, "goal entry failed");
                    eprintln!("Error: {}\n", e);
                }
            }
            "3" => {
                run_validation(cfg, None, None);
                println!();
            }
            "4" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1, 2, 3 or 4.\n"),
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let cfg = match AppConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match &cli.command {
        Some(Command::Validate { history, events, report }) => {
            let result = run_validation(&cfg, history.as_deref(), events.as_deref());
            if let Some(path) = report {
                if let Err(e) = output::write_csv(path, &result.issues) {
                    eprintln!("Write error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            if result.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            menu(&cfg, &cli);
            ExitCode::SUCCESS
        }
    }
}
