use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dailycal", version, about = "Month calendar with daily notes")]
pub struct Cli {
    /// Preferences file holding your notes (defaults to the user data dir)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,
    /// First day of the week in the grid (sun, mon, ...)
    #[arg(long, global = true)]
    pub first_weekday: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the month grid
    Month {
        /// Month to show in YYYY-MM format (defaults to the current month)
        month: Option<String>,
    },
    /// Show the note for a day
    Show {
        /// Date in YYYY-MM-DD format
        date: String,
    },
    /// Save the quick and/or detailed note for a day
    Note {
        /// Date in YYYY-MM-DD format
        date: String,
        /// Quick note (25 characters max, longer text is cut)
        #[arg(long, short = 'q')]
        quick: Option<String>,
        /// Detailed note
        #[arg(long, short = 'd')]
        detail: Option<String>,
    },
    /// Search notes, newest first
    Search {
        /// Text to look for (lists every note when omitted)
        query: Option<String>,
    },
    /// Launch the interactive calendar
    Tui,
}
