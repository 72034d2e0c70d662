use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;

use worklist_lib::commands::{
    add_task_impl, clear_all_impl, delete_task_impl, export_csv_impl, handle_message_impl,
    import_file_impl, list_tasks_impl, toggle_daily_impl, toggle_monthly_impl, toggle_weekly_impl,
    CommandCtx, CommandResult, HostMessage,
};
use worklist_lib::events::{StatePayload, EVENT_RELOAD_REQUESTED, EVENT_STATE_UPDATED};
use worklist_lib::logging::init_logging;
use worklist_lib::overview::{daily_matrix, monthly_summary, weekly_current, MONTHLY_SUMMARY_SPAN};
use worklist_lib::period::{day_key, month_key};
use worklist_lib::{
    AppState, FileStore, PersistenceAdapter, StorageError, TaskId, TaskKind, ViewKind,
};

/// Daily, weekly and monthly task tracker.
#[derive(Debug, Parser)]
#[command(
    name = "worklist",
    version,
    about = "Worklist - daily, weekly and monthly task tracker"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding stored tasks, logs and exports
    #[arg(long, global = true, env = "WORKLIST_DATA_DIR", default_value = ".worklist")]
    data_dir: PathBuf,

    /// Reference date (YYYY-MM-DD); defaults to today
    #[arg(long, global = true)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a task to the reference date's month.
    Add {
        /// daily, weekly or monthly
        kind: TaskKind,
        text: String,
    },
    /// Flip a completion.
    Toggle {
        #[command(subcommand)]
        target: ToggleTarget,
    },
    /// Delete a task from the reference date's month.
    Delete {
        /// daily, weekly or monthly
        kind: TaskKind,
        id: TaskId,
        #[arg(long)]
        week: Option<u8>,
    },
    /// List tasks of one kind for the reference date's month.
    List {
        /// daily, weekly or monthly
        kind: TaskKind,
    },
    /// Completion statistics for a view.
    Stats {
        /// day, week, month or overview
        #[arg(long, default_value = "day")]
        view: ViewKind,
        /// Periods to move from the reference date before counting
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        step: i32,
    },
    /// Overview projections.
    Overview {
        #[command(subcommand)]
        section: OverviewSection,
    },
    /// Write the month's daily table as CSV.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace every task from a JSON export (CSV is rejected).
    Import { path: PathBuf },
    /// Remove every task.
    Clear,
    /// Handle a host control message given as JSON.
    Message { json: String },
}

#[derive(Debug, Subcommand)]
enum ToggleTarget {
    /// Completion of a daily task on the reference date.
    Daily { id: TaskId },
    /// Completion of a weekly task in one week slot.
    Weekly {
        id: TaskId,
        #[arg(long)]
        week: u8,
    },
    /// Completion of a monthly task.
    Monthly { id: TaskId },
}

#[derive(Debug, Subcommand)]
enum OverviewSection {
    /// Task x day grid for the month.
    Daily,
    /// Weekly tasks in the current week of the month.
    Weekly,
    /// Monthly tasks for recent months.
    Monthly {
        #[arg(long, default_value_t = MONTHLY_SUMMARY_SPAN)]
        span: u32,
    },
}

struct CliCtx {
    data_dir: PathBuf,
}

impl CommandCtx for CliCtx {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError> {
        Ok(self.data_dir.clone())
    }

    fn emit_state_updated(&self, payload: StatePayload) {
        log::debug!(
            "{EVENT_STATE_UPDATED} last_updated={}",
            payload.last_updated.as_deref().unwrap_or("-")
        );
    }

    fn request_reload(&self) {
        log::info!("{EVENT_RELOAD_REQUESTED}");
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("json error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_result<T: Serialize>(result: &CommandResult<T>) -> ExitCode {
    let code = print_json(result);
    if result.ok {
        code
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.data_dir) {
        eprintln!("logger init failed: {e}");
    }

    let file_store = FileStore::new(cli.data_dir.clone());
    if let Err(e) = file_store.ensure_dirs().await {
        eprintln!("storage error: {e}");
        return ExitCode::FAILURE;
    }

    let today = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let state = match AppState::bootstrap(PersistenceAdapter::new(file_store), today).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("storage error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let ctx = CliCtx {
        data_dir: cli.data_dir.clone(),
    };
    let month = month_key(today);

    match cli.command {
        Command::Add { kind, text } => {
            print_result(&add_task_impl(&ctx, &state, kind, today, &text).await)
        }
        Command::Toggle { target } => {
            let result = match target {
                ToggleTarget::Daily { id } => {
                    toggle_daily_impl(&ctx, &state, &month, id, &day_key(today)).await
                }
                ToggleTarget::Weekly { id, week } => {
                    toggle_weekly_impl(&ctx, &state, &month, id, week).await
                }
                ToggleTarget::Monthly { id } => toggle_monthly_impl(&ctx, &state, &month, id).await,
            };
            print_result(&result)
        }
        Command::Delete { kind, id, week } => {
            print_result(&delete_task_impl(&ctx, &state, kind, &month, id, week).await)
        }
        Command::List { kind } => print_result(&list_tasks_impl(&state, kind, today)),
        Command::Stats { view, step } => {
            let tasks = state.tasks();
            let stats = state.with_cursor(|cursor| {
                cursor.switch_view(view);
                cursor.navigate(step);
                cursor.stats(&tasks)
            });
            print_json(&serde_json::json!({ "cursor": state.cursor(), "stats": stats }))
        }
        Command::Overview { section } => {
            let tasks = state.tasks();
            match section {
                OverviewSection::Daily => print_json(&daily_matrix(&tasks, today)),
                OverviewSection::Weekly => print_json(&weekly_current(&tasks, today)),
                OverviewSection::Monthly { span } => {
                    print_json(&monthly_summary(&tasks, today, span))
                }
            }
        }
        Command::Export { out } => {
            let result = export_csv_impl(&ctx, &state, today, out).await;
            match &result.data {
                Some(path) if result.ok => {
                    println!("{path}");
                    ExitCode::SUCCESS
                }
                _ => print_result(&result),
            }
        }
        Command::Import { path } => print_result(&import_file_impl(&ctx, &state, &path).await),
        Command::Clear => print_result(&clear_all_impl(&ctx, &state).await),
        Command::Message { json } => match serde_json::from_str::<HostMessage>(&json) {
            Ok(message) => print_result(&handle_message_impl(&ctx, &state, message).await),
            Err(e) => {
                eprintln!("invalid message: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
