//! Terminal collaborator for the task-list core.
//!
//! # Responsibility
//! - Map subcommands onto the task service and print plain results.
//! - Own the delete confirmation prompt; the service never asks.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tasklist_core::db::open_db;
use tasklist_core::model::task::format_timestamp;
use tasklist_core::{
    default_log_level, init_logging, parse_task_id, validate_filter, SlotTaskRepository,
    SqliteKeyValueSlot, Task, TaskErrorKind, TaskService, TaskServiceError,
};

const DB_PATH_ENV: &str = "TASKLIST_DB_PATH";
const DB_FILE_NAME: &str = "tasklist.sqlite3";

#[derive(Parser, Debug)]
#[command(name = "tasklist", version)]
#[command(about = "Single-user task list", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite file holding the task list (defaults to $TASKLIST_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a task
    #[command(alias = "a")]
    Add { text: String },

    /// List tasks
    #[command(alias = "ls")]
    List {
        /// all|pending|completed
        #[arg(default_value = "all")]
        filter: String,
    },

    /// Flip a task between pending and completed
    #[command(alias = "t")]
    Toggle { id: String },

    /// Replace the text of a task
    #[command(alias = "e")]
    Edit { id: String, text: String },

    /// Remove a task
    #[command(alias = "rm")]
    Remove {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show total/completed/pending counters
    Stats,

    /// Check core linkage
    Ping,
}

struct Failure {
    kind: TaskErrorKind,
    message: String,
}

impl From<TaskServiceError> for Failure {
    fn from(value: TaskServiceError) -> Self {
        Self {
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}

impl From<tasklist_core::ValidationError> for Failure {
    fn from(value: tasklist_core::ValidationError) -> Self {
        TaskServiceError::from(value).into()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error[{}]: {}", failure.kind, failure.message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Failure> {
    if let Commands::Ping = cli.command {
        println!("tasklist_core ping={}", tasklist_core::ping());
        println!("tasklist_core version={}", tasklist_core::core_version());
        return Ok(());
    }

    let db_path = resolve_db_path(cli.db.as_ref());
    let conn = open_db(&db_path).map_err(|err| Failure {
        kind: TaskErrorKind::PersistenceError,
        message: format!("cannot open `{}`: {err}", db_path.display()),
    })?;
    let mut service = TaskService::new(SlotTaskRepository::new(SqliteKeyValueSlot::new(&conn)));

    match &cli.command {
        Commands::Add { text } => {
            let task = service.add(text)?;
            println!("added {}", render_task(&task));
        }
        Commands::List { filter } => {
            let filter = validate_filter(filter.trim())?;
            for task in service.list(filter) {
                println!("{}", render_task(&task));
            }
        }
        Commands::Toggle { id } => {
            let task = service.toggle(parse_task_id(id)?)?;
            println!("{}", render_task(&task));
        }
        Commands::Edit { id, text } => {
            let task = service.edit(parse_task_id(id)?, text)?;
            println!("updated {}", render_task(&task));
        }
        Commands::Remove { id, yes } => {
            let id = parse_task_id(id)?;
            let Some(task) = service.get(id) else {
                return Err(TaskServiceError::NotFound(id).into());
            };
            if !yes && !confirm(&format!("Remove \"{}\"?", task.text)) {
                println!("cancelled");
                return Ok(());
            }
            service.remove(id)?;
            println!("removed {id}");
        }
        Commands::Stats => {
            let stats = service.stats();
            println!(
                "total={} completed={} pending={}",
                stats.total, stats.completed, stats.pending
            );
        }
        Commands::Ping => {}
    }

    Ok(())
}

fn resolve_db_path(flag: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return path.clone();
    }
    match std::env::var(DB_PATH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => std::env::temp_dir().join(DB_FILE_NAME),
    }
}

fn render_task(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!(
        "[{mark}] {} {} ({})",
        task.id,
        task.text,
        format_timestamp(task.created_at)
    )
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
