//! Command-line front end for TaskSync.
//!
//! # Responsibility
//! - Act as the thinnest presentation surface over `tasksync_core`.
//! - Sign one user in, run one handler, print the list and any alerts.

use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tasksync_core::{
    init_logging_from_config, CoreConfig, Identity, IdentityChannel, IdentityWatcher, Item,
    ItemId, MutationOutcome, SqliteTaskStore, SyncState, TaskSynchronizer,
};

#[derive(Debug, Parser)]
#[command(name = "tasksync", version, about = "Track dated tasks per user")]
struct Cli {
    /// SQLite database file (defaults to TASKSYNC_DB_PATH, then a temp file).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Identity to sign in as.
    #[arg(long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core linkage info.
    Ping,
    /// Show all items.
    List,
    /// Create an item.
    Add {
        description: String,
        date: String,
        time: String,
    },
    /// Flip an item's done flag.
    Toggle { id: String },
    /// Delete an item.
    Remove { id: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    if matches!(cli.command, Command::Ping) {
        println!("tasksync_core ping={}", tasksync_core::ping());
        println!("tasksync_core version={}", tasksync_core::core_version());
        return ExitCode::SUCCESS;
    }

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let store = match SqliteTaskStore::open(&db_path) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("error: cannot open {}: {err}", db_path.display());
            return ExitCode::FAILURE;
        }
    };

    match run(cli, store, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, store: SqliteTaskStore, config: &CoreConfig) -> Result<(), String> {
    let sync = Arc::new(TaskSynchronizer::with_config(store, config.sync.clone()));
    let mut failures = sync.subscribe_failures();
    let mut view = sync.subscribe_view();

    let identity = IdentityChannel::signed_out();
    let subscription = identity.subscribe();
    let subscription_handle = subscription.handle();
    let driver = tokio::spawn(Arc::clone(&sync).follow_identity(subscription));

    identity.sign_in(Identity::new(cli.user));
    view.wait_for(|view| view.state == SyncState::Ready)
        .await
        .map_err(|_| "error: synchronizer stopped before the list loaded".to_string())?;

    info!("event=cli_command module=cli status=start command={:?}", cli.command);
    let outcome = match cli.command {
        Command::Ping | Command::List => None,
        Command::Add {
            description,
            date,
            time,
        } => Some(sync.add(description, date, time).await),
        Command::Toggle { id } => Some(sync.toggle_status(&ItemId::new(id)).await),
        Command::Remove { id } => Some(sync.remove(&ItemId::new(id)).await),
    };

    for item in sync.items() {
        println!("{}", render_item(&item));
    }

    let mut alerts = Vec::new();
    while let Ok(notice) = failures.try_recv() {
        alerts.push(notice.to_string());
    }

    subscription_handle.cancel();
    if driver.await.is_err() {
        alerts.push("error: identity driver panicked".to_string());
    }

    if let Some(MutationOutcome::Skipped(reason)) = outcome {
        alerts.push(format!("nothing to do: {reason:?}"));
    }
    if alerts.is_empty() {
        Ok(())
    } else {
        Err(alerts.join("\n"))
    }
}

fn render_item(item: &Item) -> String {
    format!(
        "[{}] {}  {} {}  {}",
        if item.done { "x" } else { " " },
        item.id,
        item.date,
        item.time,
        item.description
    )
}
