mod app;
mod branch;
mod coordinator;
mod domain;
mod error;
mod git;
mod input;
mod notifications;
mod persistence;
mod recovery;
mod sync;
mod ticker;
mod tracker;
mod ui;

use anyhow::{Context, Result};
use app::AppState;
use branch::{handle_branch_change, BranchOutcome};
use clap::{Parser, Subcommand};
use coordinator::{TimerCoordinator, TimerSettings};
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use domain::{format_elapsed, task_rows, total_elapsed, SystemClock};
use git::BranchWatcher;
use notifications::UiEvent;
use persistence::{
    config_file, ensure_data_dir, forget_token, init_local_data_dir, load_config, log_file,
    save_config, Config, FileBlobStore, TaskStore,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use recovery::RecoveryOutcome;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Mutex;
use sync::{SendOutcome, SyncSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracker::HttpTracker;

type FileCoordinator = TimerCoordinator<FileBlobStore, SystemClock>;

#[derive(Parser)]
#[command(name = "trh")]
#[command(about = "Per-task work timer that sends tracked time to Yandex Tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .tracker-helper directory in the current directory
    Init,
    /// Load your tasks from the tracker
    Fetch,
    /// List cached tasks with their tracked time
    List,
    /// Show the running timer
    Status,
    /// Start timing a task (stops any other running timer)
    Start {
        /// Task key, e.g. QUEUE-12
        key: String,
    },
    /// Stop the running timer
    Stop,
    /// Bind a git branch to a task
    Assign {
        key: String,
        /// Branch name. Defaults to the current branch.
        branch: Option<String>,
    },
    /// Send a task's tracked time as a worklog and reset it
    Send {
        key: String,
        /// Worklog comment
        #[arg(short = 'm', long)]
        comment: Option<String>,
    },
    /// Send tracked time for every task
    SendAll {
        /// Worklog comment
        #[arg(short = 'm', long)]
        comment: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Forget all cached tasks, timers and the token stored in config.json
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// React to a branch switch (e.g. from a post-checkout hook)
    BranchChanged {
        /// Branch name. Defaults to the current branch.
        branch: Option<String>,
    },
    /// Interactive task list with a live timer
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Init) = cli.command {
        let data_dir = init_local_data_dir()?;
        save_config(config_file(&data_dir), &Config::default())?;
        println!("Initialized tracker-helper directory: {}", data_dir.display());
        println!();
        println!("Set your credentials in {}", config_file(&data_dir).display());
        println!("or via the TRACKER_HELPER_TOKEN and TRACKER_HELPER_ORG_ID variables,");
        println!("then run 'trh fetch' to load your tasks.");
        return Ok(());
    }

    let data_dir = ensure_data_dir()?;
    init_logging(&data_dir)?;
    let config = load_config(config_file(&data_dir))?.with_env_overrides();

    let coordinator = open_coordinator(&data_dir, &config)?;
    let (mut coordinator, result) = match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => run_tui(coordinator),
        command => {
            let mut coordinator = coordinator;
            let result = run_command(command, &mut coordinator, &config, &data_dir);
            (coordinator, result)
        }
    };

    let flushed = coordinator.shutdown();
    print_notices(&mut coordinator);
    result?;
    flushed
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let path = log_file(data_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Open the task store and resume (or close) a timer left running
fn open_coordinator(data_dir: &Path, config: &Config) -> Result<FileCoordinator> {
    let store = TaskStore::new(FileBlobStore::new(data_dir));
    let (coordinator, outcome) =
        TimerCoordinator::recover(store, SystemClock, TimerSettings::from(config))?;
    match &outcome {
        RecoveryOutcome::Idle => {}
        RecoveryOutcome::Resumed { key } => info!(task = %key, "timer resumed"),
        RecoveryOutcome::ForceStopped { key, .. } => info!(task = %key, "stale timer stopped"),
    }
    Ok(coordinator)
}

fn run_command(
    command: Commands,
    coordinator: &mut FileCoordinator,
    config: &Config,
    data_dir: &Path,
) -> Result<()> {
    let settings = SyncSettings::from(config);

    match command {
        Commands::Fetch => {
            let mut service = tracker_service(config)?;
            let summary = sync::fetch_tasks(coordinator, &mut service)?;
            println!(
                "Fetched tasks: {} new, {} updated",
                summary.inserted, summary.patched
            );
            Ok(())
        }
        Commands::List => {
            let tasks = coordinator.store().get_all()?;
            if tasks.is_empty() {
                println!("No tasks. Run 'trh fetch' to load your tasks.");
                return Ok(());
            }
            let now = coordinator.now();
            for row in task_rows(&tasks, now) {
                println!(
                    "{} {:<16} {:>10}  {:<8} {}",
                    row.status.badge(),
                    row.key,
                    row.elapsed_formatted(),
                    row.status.to_tag(),
                    row.branch
                );
            }
            println!();
            println!("Total: {}", format_elapsed(total_elapsed(&tasks, now)));
            Ok(())
        }
        Commands::Status => {
            match coordinator.running_key().map(str::to_string) {
                Some(key) => {
                    let elapsed = coordinator.elapsed(&key)?.unwrap_or_default();
                    println!("{}: {}", key, format_elapsed(elapsed));
                }
                None => println!("No timer running"),
            }
            Ok(())
        }
        Commands::Start { key } => {
            coordinator.select_task(&key)?;
            coordinator.start()?;
            println!("Timer started for {}", key.trim());
            Ok(())
        }
        Commands::Stop => {
            match coordinator.running_key().map(str::to_string) {
                Some(key) => {
                    coordinator.stop()?;
                    let elapsed = coordinator.elapsed(&key)?.unwrap_or_default();
                    println!("Timer stopped for {} ({})", key, format_elapsed(elapsed));
                }
                None => println!("No timer running"),
            }
            Ok(())
        }
        Commands::Assign { key, branch } => {
            let branch = match branch {
                Some(branch) => branch,
                None => current_branch()?,
            };
            if !coordinator.store_mut().assign_branch(&key, &branch)? {
                anyhow::bail!("Could not assign branch \"{}\" to task {}", branch, key);
            }
            coordinator.emit(UiEvent::TaskChanged(key.clone()));
            println!("Branch \"{}\" assigned to {}", branch, key);
            Ok(())
        }
        Commands::Send { key, comment } => {
            let mut service = tracker_service(config)?;
            let outcome =
                sync::send_time_for_task(coordinator, &mut service, settings, &key, comment.as_deref())?;
            if let SendOutcome::Sent { elapsed_ms } = outcome {
                println!("Sent {} for {}", format_elapsed(elapsed_ms), key.trim());
            }
            Ok(())
        }
        Commands::SendAll { comment, yes } => {
            if !yes && !confirm("Send tracked time for all tasks?")? {
                return Ok(());
            }
            let mut service = tracker_service(config)?;
            let summary =
                sync::send_time_for_all_tasks(coordinator, &mut service, settings, comment.as_deref())?;
            if summary.failed > 0 {
                anyhow::bail!("Failed to send time for {} tasks", summary.failed);
            }
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes && !confirm("Clear all tasks, tracked time and the stored token?")? {
                return Ok(());
            }
            sync::clear_all_data(coordinator)?;
            if forget_token(config_file(data_dir))? {
                info!("stored token removed");
            }
            Ok(())
        }
        Commands::BranchChanged { branch } => {
            let branch = match branch {
                Some(branch) => Some(branch),
                None => git::current_branch(&std::env::current_dir()?)?,
            };
            match handle_branch_change(coordinator, branch.as_deref())? {
                BranchOutcome::Started(key) => {
                    let branch = branch.unwrap_or_default();
                    notifications::notify_auto_started(&key, &branch);
                    println!("Timer started for {} (branch {})", key, branch);
                }
                BranchOutcome::NoMatch => println!("No task is bound to this branch"),
                BranchOutcome::Ambiguous(_) | BranchOutcome::Ignored => {}
            }
            Ok(())
        }
        Commands::Init | Commands::Watch => Ok(()),
    }
}

fn tracker_service(config: &Config) -> Result<HttpTracker> {
    if !config.has_credentials() {
        anyhow::bail!(
            "Tracker credentials are not configured. Set token and org_id in config.json \
             or TRACKER_HELPER_TOKEN / TRACKER_HELPER_ORG_ID."
        );
    }
    Ok(HttpTracker::from_config(config))
}

fn current_branch() -> Result<String> {
    let dir = std::env::current_dir().context("Could not determine current directory")?;
    git::current_branch(&dir)?.context("Not on a git branch; pass the branch name explicitly")
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Print messages the core produced for the user
fn print_notices(coordinator: &mut FileCoordinator) {
    for event in coordinator.drain_events() {
        if let UiEvent::Notice(notice) = event {
            eprintln!("[{}] {}", notice.severity.label(), notice.message);
        }
    }
}

fn run_tui(coordinator: FileCoordinator) -> (FileCoordinator, Result<()>) {
    let watcher = std::env::current_dir()
        .ok()
        .filter(|dir| git::find_git_dir(dir).is_some())
        .map(BranchWatcher::new);

    let mut app = AppState::new(coordinator, watcher);
    let result = run_in_terminal(&mut app);
    (app.coordinator, result)
}

fn run_in_terminal(app: &mut AppState<FileBlobStore, SystemClock>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableFocusChange, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState<FileBlobStore, SystemClock>,
) -> Result<()> {
    let poll_rate = ticker::poll_duration();

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        // Handle events with timeout for ticking
        if event::poll(poll_rate)? {
            match event::read()? {
                // Only process key press events (ignore key release)
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if input::handle_key(app, key)? {
                        return Ok(());
                    }
                }
                Event::FocusLost => app.on_focus_lost(),
                _ => {}
            }
        }

        app.tick()?;
    }
}
