use anyhow::Result;
use clap::Parser;
use dailycal::cli::{Cli, Command};
use dailycal::commands::{self, Session};
use dailycal::storage::StoreLocation;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The TUI owns the terminal, so it logs to a file; other commands use stderr.
fn init_tracing(log_file: Option<PathBuf>) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "dailycal=info".into()),
    );

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    eprintln!("logging disabled: cannot create {}: {}", parent.display(), err);
                    return;
                }
            }
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(err) => {
                    eprintln!("logging disabled: cannot open {}: {}", path.display(), err);
                    return;
                }
            };
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let command = args.command.unwrap_or(Command::Tui);

    let log_file = match command {
        Command::Tui => {
            let location = StoreLocation::resolve(args.data.clone())?;
            Some(location.data_dir().join("dailycal.log"))
        }
        _ => None,
    };
    init_tracing(log_file);

    let session = Session::resolve(args.data, args.first_weekday)?;
    match command {
        Command::Month { month } => commands::month(&session, month),
        Command::Show { date } => commands::show(&session, date),
        Command::Note {
            date,
            quick,
            detail,
        } => commands::note(&session, date, quick, detail),
        Command::Search { query } => commands::search(&session, query),
        Command::Tui => commands::tui(&session),
    }
}
