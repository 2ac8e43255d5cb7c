//! mileage - weekly mileage tracker on the command line.
//!
//! Shows cached data immediately and refreshes it from the backend; entries
//! are added optimistically and rolled back if the backend rejects them.

mod args;
mod render;

use std::io;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mileage_core::{Config, Tracker, Update};

use args::{Args, Command, USAGE};

/// Directory for a daily-rolling log file, if set
const LOG_DIR_ENV: &str = "MILEAGE_LOG_DIR";
const LOG_FILE_PREFIX: &str = "mileage.log";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // RUST_LOG controls the level (e.g., RUST_LOG=mileage_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Print status notifications as they arrive. Data updates are rendered
/// once the command finishes.
async fn relay_status(mut rx: mpsc::UnboundedReceiver<Update>) {
    while let Some(update) = rx.recv().await {
        if let Update::Status(status) = update {
            render::print_status(&status);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    if args.command == Command::Init {
        config.save()?;
        println!("Wrote {}", Config::config_path()?.display());
        return Ok(());
    }

    let (mut tracker, rx) = Tracker::from_config(&config)?;
    let relay = tokio::spawn(relay_status(rx));
    info!(command = ?args.command, "mileage starting");

    let result = run(&mut tracker, &args).await;

    // Closing the channel lets the relay drain and finish
    drop(tracker);
    let _ = relay.await;
    result
}

async fn run(tracker: &mut Tracker, args: &Args) -> Result<()> {
    tracker.start().await;

    if let Some(person) = &args.person {
        tracker.select_person(person).await?;
    }
    if let Some(week) = &args.week {
        tracker.select_week(week).await?;
    }
    if let Some(day) = args.day {
        tracker.select_day(day)?;
    }
    if let Some(category) = &args.category {
        tracker.select_category(category)?;
    }

    match &args.command {
        Command::Show => render::print_week(tracker.state()),
        Command::Weeks => render::print_weeks(tracker.state()),
        Command::Add { miles } => {
            tracker.add_entry_from_selection(miles).await?;
            render::print_week(tracker.state());
        }
        Command::Refresh => {
            tracker.force_refresh().await;
            render::print_week(tracker.state());
        }
        Command::Init => {}
    }
    Ok(())
}
